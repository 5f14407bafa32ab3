//! Exclusion rule matching.
//!
//! # Responsibilities
//! - Match path prefixes, path suffixes and file extensions
//! - Match excluded methods (case-insensitive)
//! - Match excluded body content types by media-type essence
//!
//! # Design Decisions
//! - Path matching is case-sensitive; extensions and methods are not
//! - Prefixes and suffixes only match on whole path segments
//! - Rules are compiled once from `SanitizerConfig`
//! - No regex to guarantee O(n) matching

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{header, Request};

use crate::config::schema::SanitizerConfig;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        let path = req.uri().path();
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }
}

/// Matches the request path suffix.
#[derive(Debug, Clone)]
pub struct PathSuffixMatcher {
    suffix: String,
}

impl PathSuffixMatcher {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Matcher for PathSuffixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        let path = req.uri().path();
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        match path.strip_suffix(self.suffix.as_str()) {
            Some(rest) => rest.is_empty() || rest.ends_with('/') || self.suffix.starts_with('/'),
            None => false,
        }
    }
}

/// Matches the extension of the last path segment.
#[derive(Debug, Clone)]
pub struct ExtensionMatcher {
    extensions: HashSet<String>,
}

impl ExtensionMatcher {
    /// Extensions are normalized to lowercase without a leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }
}

impl Matcher for ExtensionMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        let segment = req.uri().path().rsplit('/').next().unwrap_or("");
        segment
            .rsplit_once('.')
            .map(|(_, ext)| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: HashSet<String>,
}

impl MethodMatcher {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            methods: methods.into_iter().map(|m| m.as_ref().to_uppercase()).collect(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.methods.contains(req.method().as_str())
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().any(|m| m.matches(req))
    }
}

/// Compiled exclusion rules.
#[derive(Debug)]
pub struct ExclusionRules {
    request: AnyMatcher,
    content_types: Vec<String>,
}

impl ExclusionRules {
    pub fn from_policy(policy: &SanitizerConfig) -> Self {
        let paths = &policy.excluded_paths;
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();

        for prefix in &paths.prefixes {
            matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }
        for suffix in &paths.suffixes {
            matchers.push(Box::new(PathSuffixMatcher::new(suffix.clone())));
        }
        if !paths.extensions.is_empty() {
            matchers.push(Box::new(ExtensionMatcher::new(&paths.extensions)));
        }
        if !policy.excluded_methods.is_empty() {
            matchers.push(Box::new(MethodMatcher::new(&policy.excluded_methods)));
        }

        Self {
            request: AnyMatcher::new(matchers),
            content_types: policy
                .excluded_content_types
                .iter()
                .map(|ct| media_type(ct))
                .collect(),
        }
    }

    /// True when the whole pipeline is bypassed for `req`.
    pub fn skips_request(&self, req: &Request<Body>) -> bool {
        self.request.matches(req)
    }

    /// True when the body of `req` is forwarded without inspection.
    pub fn skips_body(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| self.content_types.contains(&media_type(ct)))
            .unwrap_or(false)
    }
}

/// Lower-cased media type without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::default())
            .unwrap()
    }

    fn rules() -> ExclusionRules {
        ExclusionRules::from_policy(&SanitizerConfig::default())
    }

    #[test]
    fn test_path_prefix_matcher() {
        let matcher = PathPrefixMatcher::new("/health");
        assert!(matcher.matches(&req("GET", "/health/db")));
        assert!(!matcher.matches(&req("GET", "/api/health-check")));
        assert!(matcher.matches(&req("GET", "/health")));
        assert!(!matcher.matches(&req("POST", "/healthcare/patients")));

        let open = PathPrefixMatcher::new("/static/");
        assert!(open.matches(&req("GET", "/static/app")));
    }

    #[test]
    fn test_path_suffix_matcher() {
        let matcher = PathSuffixMatcher::new("/ready");
        assert!(matcher.matches(&req("GET", "/svc/ready")));
        assert!(!matcher.matches(&req("GET", "/svc/ready/now")));
        assert!(matcher.matches(&req("GET", "/svc/ready/")));
        assert!(!matcher.matches(&req("GET", "/svc/already")));

        let bare = PathSuffixMatcher::new("status");
        assert!(bare.matches(&req("GET", "/svc/status")));
        assert!(!bare.matches(&req("GET", "/svc/jobstatus")));
    }

    #[test]
    fn test_extension_matcher() {
        let matcher = ExtensionMatcher::new([".css", "PNG"]);
        assert!(matcher.matches(&req("GET", "/static/site.CSS")));
        assert!(matcher.matches(&req("GET", "/img/logo.png?v=2")));
        assert!(!matcher.matches(&req("GET", "/api.css/users")));
        assert!(!matcher.matches(&req("GET", "/api/users")));
    }

    #[test]
    fn test_default_rules() {
        let rules = rules();
        assert!(rules.skips_request(&req("GET", "/metrics")));
        assert!(rules.skips_request(&req("GET", "/api/v1/live")));
        assert!(rules.skips_request(&req("GET", "/assets/app.js")));
        assert!(rules.skips_request(&req("OPTIONS", "/api/users")));
        assert!(!rules.skips_request(&req("POST", "/api/users")));
    }

    #[test]
    fn test_default_prefixes_respect_segments() {
        let rules = rules();
        assert!(rules.skips_request(&req("GET", "/docs/index")));
        for path in ["/healthcare/patients", "/docsign/upload", "/metricsdashboard/save"] {
            assert!(!rules.skips_request(&req("POST", path)), "{path} was skipped");
        }
    }

    #[test]
    fn test_body_content_type_exclusion() {
        let rules = rules();
        let multipart = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", "Multipart/Form-Data; boundary=xyz")
            .body(Body::default())
            .unwrap();
        assert!(rules.skips_body(&multipart));
        assert!(!rules.skips_request(&multipart));

        let json = Request::builder()
            .header("content-type", "application/json")
            .body(Body::default())
            .unwrap();
        assert!(!rules.skips_body(&json));
    }
}
