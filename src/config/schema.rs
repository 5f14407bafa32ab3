//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::detection::{InjectionClass, RiskLevel};

/// Root configuration for the sanitizing proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, backpressure).
    pub listener: ListenerConfig,

    /// Upstream application that receives sanitized requests.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Input sanitization policy.
    pub sanitizer: SanitizerConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Operator-supplied detection pattern appended to a class.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomPatternConfig {
    pub class: InjectionClass,
    pub pattern: String,
}

/// Paths that bypass the sanitization pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExcludedPathsConfig {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    /// File extensions without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for ExcludedPathsConfig {
    fn default() -> Self {
        Self {
            prefixes: ["/health", "/metrics", "/swagger", "/docs", "/openapi"]
                .map(String::from)
                .to_vec(),
            suffixes: ["/health", "/ready", "/live"].map(String::from).to_vec(),
            extensions: [
                "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf",
                "map",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Input sanitization policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Master switch; when off every request is forwarded untouched.
    pub enabled: bool,

    pub block_on_injection_detection: bool,

    /// Minimum risk level that blocks a request.
    pub blocking_risk_threshold: RiskLevel,

    pub block_on_sanitization_error: bool,

    pub block_on_invalid_structured_input: bool,

    pub block_on_oversized_body: bool,

    /// Body buffering limit in bytes.
    pub max_request_body_size: usize,

    /// Character limit for free-text fields.
    pub max_text_field_length: usize,

    pub max_header_value_length: usize,

    pub log_injection_attempts: bool,

    /// Include raw (log-escaped) values in detection logs.
    pub log_sensitive_raw_value: bool,

    pub include_detection_details_in_error_response: bool,

    pub excluded_paths: ExcludedPathsConfig,

    pub excluded_methods: Vec<String>,

    /// Content types whose body is forwarded without inspection.
    pub excluded_content_types: Vec<String>,

    pub allow_html_in_text_fields: bool,

    /// Header names (lower-case) whose values are inspected.
    pub inspected_headers: Vec<String>,

    /// Prefix added to phone numbers without a leading `+`.
    pub default_country_prefix: String,

    pub custom_patterns: Vec<CustomPatternConfig>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_on_injection_detection: true,
            blocking_risk_threshold: RiskLevel::High,
            block_on_sanitization_error: false,
            block_on_invalid_structured_input: false,
            block_on_oversized_body: true,
            max_request_body_size: 2 * 1024 * 1024,
            max_text_field_length: 10_000,
            max_header_value_length: 2048,
            log_injection_attempts: true,
            log_sensitive_raw_value: false,
            include_detection_details_in_error_response: false,
            excluded_paths: ExcludedPathsConfig::default(),
            excluded_methods: vec!["OPTIONS".to_string()],
            excluded_content_types: vec![
                "multipart/form-data".to_string(),
                "application/octet-stream".to_string(),
            ],
            allow_html_in_text_fields: false,
            inspected_headers: [
                "referer",
                "origin",
                "x-forwarded-for",
                "x-forwarded-host",
                "x-forwarded-proto",
                "x-real-ip",
                "x-original-url",
                "x-requested-with",
            ]
            .map(String::from)
            .to_vec(),
            default_country_prefix: "+1".to_string(),
            custom_patterns: Vec::new(),
        }
    }
}
