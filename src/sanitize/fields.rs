//! Specialized field validators.
//!
//! # Responsibilities
//! - Normalize and validate emails, phone numbers, URLs and file paths
//! - Reject values that cannot be made safe instead of guessing
//!
//! # Design Decisions
//! - Every validator returns `Result<String, FieldError>` and never panics
//! - URLs are parsed with the `url` crate, never matched by regex alone

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_EMAIL_LOCAL_LENGTH: usize = 64;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_FILE_PATH_LENGTH: usize = 255;

const MIN_PHONE_LENGTH: usize = 7;
const MAX_PHONE_LENGTH: usize = 15;
const MIN_INTERNATIONAL_PHONE_LENGTH: usize = 8;

const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps", "mailto"];

const EMAIL_LOCAL_SPECIALS: &str = "!#$%*+/=?^_`{|}~.-";

#[cfg(windows)]
const PLATFORM_INVALID_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];
#[cfg(not(windows))]
const PLATFORM_INVALID_PATH_CHARS: &[char] = &[];

static TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.|%2e|%252e)(\.|%2e|%252e)(/|\\|%2f|%5c|%252f|%255c)").expect("valid regex")
});

static TRAILING_PARENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|/|\\|%2f|%5c|%252f|%255c)(\.|%2e|%252e)(\.|%2e|%252e)$").expect("valid regex")
});

static SCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(javascript|vbscript)\s*:").expect("valid regex"));

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("valid regex"));

static SCRIPT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(eval|expression|settimeout|setinterval|function)\s*\(").expect("valid regex")
});

/// Per-field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("value is empty")]
    Empty,

    #[error("value exceeds {max} characters")]
    TooLong { max: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL scheme not allowed: {0}")]
    ForbiddenScheme(String),
}

/// Validate and lower-case an email address.
pub fn sanitize_email(value: &str) -> Result<String, FieldError> {
    let email = value.trim();
    if email.is_empty() {
        return Err(FieldError::Empty);
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(FieldError::TooLong { max: MAX_EMAIL_LENGTH });
    }
    if email
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '\''))
    {
        return Err(FieldError::InvalidFormat("forbidden character in email".into()));
    }
    if email.contains("..") {
        return Err(FieldError::InvalidFormat("consecutive dots in email".into()));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| FieldError::InvalidFormat("missing '@'".into()))?;
    if domain.contains('@') {
        return Err(FieldError::InvalidFormat("more than one '@'".into()));
    }

    if local.is_empty() || local.chars().count() > MAX_EMAIL_LOCAL_LENGTH {
        return Err(FieldError::InvalidFormat("invalid local part length".into()));
    }
    if local.starts_with('.') || local.ends_with('.') {
        return Err(FieldError::InvalidFormat("local part starts or ends with '.'".into()));
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_SPECIALS.contains(c))
    {
        return Err(FieldError::InvalidFormat("invalid character in local part".into()));
    }

    validate_domain(domain)?;
    Ok(email.to_lowercase())
}

fn validate_domain(domain: &str) -> Result<(), FieldError> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(FieldError::InvalidFormat("domain must contain a dot".into()));
    }
    for label in labels {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(FieldError::InvalidFormat(format!("invalid domain label '{label}'")));
        }
    }
    Ok(())
}

/// Normalize a phone number to `+<digits>`.
///
/// Numbers without a leading `+` get `default_country_prefix` prepended.
pub fn sanitize_phone_number(value: &str, default_country_prefix: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty);
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '0'..='9' => normalized.push(c),
            '+' if normalized.is_empty() => normalized.push(c),
            _ => {}
        }
    }

    let len = normalized.chars().count();
    if len < MIN_PHONE_LENGTH {
        return Err(FieldError::InvalidFormat("phone number too short".into()));
    }
    if len > MAX_PHONE_LENGTH {
        return Err(FieldError::TooLong { max: MAX_PHONE_LENGTH });
    }

    if normalized.starts_with('+') {
        if len < MIN_INTERNATIONAL_PHONE_LENGTH {
            return Err(FieldError::InvalidFormat("international number too short".into()));
        }
        Ok(normalized)
    } else {
        Ok(format!("{default_country_prefix}{normalized}"))
    }
}

/// Validate an absolute URL and strip script fragments from it.
pub fn sanitize_url(value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty);
    }
    if trimmed.chars().count() > MAX_URL_LENGTH {
        return Err(FieldError::TooLong { max: MAX_URL_LENGTH });
    }

    let url = Url::parse(trimmed).map_err(|e| FieldError::InvalidUrl(e.to_string()))?;
    if !ALLOWED_URL_SCHEMES.contains(&url.scheme()) {
        return Err(FieldError::ForbiddenScheme(url.scheme().to_string()));
    }

    Ok(remove_javascript(url.as_str()))
}

/// Strip script schemes, inline handlers and eval-style calls.
pub fn remove_javascript(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let next = SCRIPT_SCHEME.replace_all(&current, "");
        let next = EVENT_HANDLER.replace_all(&next, "");
        let next = SCRIPT_CALL.replace_all(&next, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Remove traversal sequences and platform-invalid characters from a path.
pub fn sanitize_file_path(value: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::Empty);
    }

    let mut current = value.to_string();
    loop {
        let next = TRAVERSAL.replace_all(&current, "");
        let next = TRAILING_PARENT.replace_all(&next, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    let filtered: String = current
        .chars()
        .filter(|c| !c.is_control() && !PLATFORM_INVALID_PATH_CHARS.contains(c))
        .collect();
    let trimmed: String = filtered
        .trim_matches(|c| c == '.' || c == ' ')
        .chars()
        .take(MAX_FILE_PATH_LENGTH)
        .collect();

    if trimmed.is_empty() {
        return Err(FieldError::InvalidFormat("path is empty after sanitization".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_lowercased() {
        assert_eq!(sanitize_email("Hello@Example.com").unwrap(), "hello@example.com");
        assert_eq!(sanitize_email("  a.b+tag@sub.example.org ").unwrap(), "a.b+tag@sub.example.org");
    }

    #[test]
    fn test_email_rejections() {
        for bad in [
            "",
            "no-at-sign",
            "a@@b.com",
            "a@b@c.com",
            "john..doe@example.com",
            ".john@example.com",
            "john.@example.com",
            "john doe@example.com",
            "<script>@example.com",
            "tom&jerry@example.com",
            "a@localhost",
            "a@-bad.com",
            "a@exa_mple.com",
            "a@example..com",
        ] {
            assert!(sanitize_email(bad).is_err(), "accepted {bad:?}");
        }
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(sanitize_email(&long_local).is_err());
        let too_long = format!("a@{}.com", "b".repeat(260));
        assert_eq!(sanitize_email(&too_long), Err(FieldError::TooLong { max: MAX_EMAIL_LENGTH }));
    }

    #[test]
    fn test_phone_default_prefix() {
        assert_eq!(sanitize_phone_number("(555) 010-2030", "+1").unwrap(), "+15550102030");
        assert_eq!(sanitize_phone_number("+44 20 7946 0958", "+1").unwrap(), "+442079460958");
    }

    #[test]
    fn test_phone_plus_only_leading() {
        assert_eq!(sanitize_phone_number("555+0102030", "+1").unwrap(), "+15550102030");
    }

    #[test]
    fn test_phone_length_limits() {
        assert!(sanitize_phone_number("12345", "+1").is_err());
        assert!(sanitize_phone_number("+123456", "+1").is_err());
        assert!(sanitize_phone_number("1234567890123456", "+1").is_err());
        assert!(sanitize_phone_number("   ", "+1").is_err());
    }

    #[test]
    fn test_url_accepts_allowed_schemes() {
        assert_eq!(sanitize_url("https://example.com/a?b=c").unwrap(), "https://example.com/a?b=c");
        assert!(sanitize_url("mailto:someone@example.com").is_ok());
    }

    #[test]
    fn test_url_rejects_bad_input() {
        assert_eq!(
            sanitize_url("javascript:alert(1)"),
            Err(FieldError::ForbiddenScheme("javascript".into()))
        );
        assert!(matches!(sanitize_url("/relative/path"), Err(FieldError::InvalidUrl(_))));
        assert!(matches!(sanitize_url("file:///etc/passwd"), Err(FieldError::ForbiddenScheme(_))));
        assert_eq!(sanitize_url(""), Err(FieldError::Empty));
    }

    #[test]
    fn test_url_strips_embedded_script() {
        let out = sanitize_url("https://example.com/?next=javascript:eval(1)").unwrap();
        assert!(!out.to_lowercase().contains("javascript:"));
        assert!(!out.to_lowercase().contains("eval("));
    }

    #[test]
    fn test_remove_javascript_nested() {
        assert_eq!(remove_javascript("javajavascript:script:x"), "x");
        assert_eq!(remove_javascript("a onclick=b"), "a b");
    }

    #[test]
    fn test_file_path_traversal_removed() {
        let out = sanitize_file_path("../../etc/passwd").unwrap();
        assert_eq!(out, "etc/passwd");
        assert!(!out.contains("../"));
    }

    #[test]
    fn test_file_path_encoded_variants() {
        for input in [
            "..%2f..%2fetc/passwd",
            "%2e%2e/%2e%2e/etc/passwd",
            "%252e%252e%252fetc/passwd",
            "..\\..\\etc/passwd",
            "..%5cetc/passwd",
            "....//etc/passwd",
        ] {
            let out = sanitize_file_path(input).unwrap();
            assert_eq!(out, "etc/passwd", "input {input:?}");
        }
    }

    #[test]
    fn test_file_path_trailing_parent_and_trim() {
        assert_eq!(sanitize_file_path("uploads/..").unwrap(), "uploads");
        assert_eq!(sanitize_file_path(" .report.pdf. ").unwrap(), "report.pdf");
        assert_eq!(sanitize_file_path("a\u{0000}b.txt").unwrap(), "ab.txt");
    }

    #[test]
    fn test_file_path_capped() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_file_path(&long).unwrap().chars().count(), MAX_FILE_PATH_LENGTH);
    }

    #[test]
    fn test_file_path_empty_after_sanitization() {
        assert!(sanitize_file_path("../..").is_err());
        assert_eq!(sanitize_file_path(""), Err(FieldError::Empty));
    }
}
