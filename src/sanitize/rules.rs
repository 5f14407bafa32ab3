//! Rule-based value validation.
//!
//! `validate` evaluates every rule and reports all violations, so a caller
//! can return a complete list to the client in one response.

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use crate::sanitize::fields::{sanitize_email, sanitize_phone_number, sanitize_url};

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").expect("valid regex"));

/// Shared predicate for application-specific checks.
pub type CustomValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Well-known value formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredFormat {
    Email,
    Phone,
    Url,
    IpAddress,
    AlphaNumeric,
    Numeric,
    Alpha,
    Base64,
    Json,
    Uuid,
    DateTime,
}

impl RequiredFormat {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            RequiredFormat::Email => sanitize_email(value).is_ok(),
            RequiredFormat::Phone => sanitize_phone_number(value, "").is_ok(),
            RequiredFormat::Url => sanitize_url(value).is_ok(),
            RequiredFormat::IpAddress => value.parse::<IpAddr>().is_ok(),
            RequiredFormat::AlphaNumeric => {
                !value.is_empty() && value.chars().all(char::is_alphanumeric)
            }
            RequiredFormat::Numeric => NUMERIC.is_match(value),
            RequiredFormat::Alpha => !value.is_empty() && value.chars().all(char::is_alphabetic),
            RequiredFormat::Base64 => {
                !value.is_empty()
                    && base64::engine::general_purpose::STANDARD.decode(value).is_ok()
            }
            RequiredFormat::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
            RequiredFormat::Uuid => uuid::Uuid::parse_str(value).is_ok(),
            RequiredFormat::DateTime => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
        }
    }
}

impl fmt::Display for RequiredFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("shorter than {min} characters")]
    TooShort { min: usize },

    #[error("longer than {max} characters")]
    TooLong { max: usize },

    #[error("does not match required pattern {0}")]
    PatternMismatch(String),

    #[error("matches forbidden pattern {0}")]
    ForbiddenPattern(String),

    #[error("character {0:?} is not allowed")]
    DisallowedCharacter(char),

    #[error("character {0:?} is forbidden")]
    ForbiddenCharacter(char),

    #[error("not a valid {0}")]
    InvalidFormat(RequiredFormat),

    #[error("rejected by custom validator")]
    CustomValidator,
}

/// Declarative validation rules for one value.
#[derive(Clone, Default)]
pub struct ValidationRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub required_pattern: Option<Regex>,
    pub forbidden_patterns: Vec<Regex>,
    pub allowed_characters: Option<BTreeSet<char>>,
    pub forbidden_characters: Option<BTreeSet<char>>,
    pub required_format: Option<RequiredFormat>,
    pub custom_validator: Option<CustomValidator>,
}

impl fmt::Debug for ValidationRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRules")
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("required_pattern", &self.required_pattern)
            .field("forbidden_patterns", &self.forbidden_patterns)
            .field("allowed_characters", &self.allowed_characters)
            .field("forbidden_characters", &self.forbidden_characters)
            .field("required_format", &self.required_format)
            .field("custom_validator", &self.custom_validator.is_some())
            .finish()
    }
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn require_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.required_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn forbid_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.forbidden_patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn allow_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.allowed_characters = Some(chars.into_iter().collect());
        self
    }

    pub fn forbid_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.forbidden_characters = Some(chars.into_iter().collect());
        self
    }

    pub fn format(mut self, format: RequiredFormat) -> Self {
        self.required_format = Some(format);
        self
    }

    pub fn custom(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.custom_validator = Some(Arc::new(validator));
        self
    }
}

/// Check `value` against every rule, collecting all violations.
pub fn validate(value: &str, rules: &ValidationRules) -> Result<(), Vec<RuleViolation>> {
    let mut violations = Vec::new();
    let len = value.chars().count();

    if let Some(min) = rules.min_length {
        if len < min {
            violations.push(RuleViolation::TooShort { min });
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            violations.push(RuleViolation::TooLong { max });
        }
    }

    if let Some(pattern) = &rules.required_pattern {
        if !pattern.is_match(value) {
            violations.push(RuleViolation::PatternMismatch(pattern.as_str().to_string()));
        }
    }
    for pattern in &rules.forbidden_patterns {
        if pattern.is_match(value) {
            violations.push(RuleViolation::ForbiddenPattern(pattern.as_str().to_string()));
        }
    }

    // One violation per distinct offending character.
    if let Some(allowed) = &rules.allowed_characters {
        let mut seen = BTreeSet::new();
        for c in value.chars().filter(|c| !allowed.contains(c)) {
            if seen.insert(c) {
                violations.push(RuleViolation::DisallowedCharacter(c));
            }
        }
    }
    if let Some(forbidden) = &rules.forbidden_characters {
        let mut seen = BTreeSet::new();
        for c in value.chars().filter(|c| forbidden.contains(c)) {
            if seen.insert(c) {
                violations.push(RuleViolation::ForbiddenCharacter(c));
            }
        }
    }

    if let Some(format) = rules.required_format {
        if !format.matches(value) {
            violations.push(RuleViolation::InvalidFormat(format));
        }
    }

    if let Some(custom) = &rules.custom_validator {
        if !custom(value) {
            violations.push(RuleViolation::CustomValidator);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
