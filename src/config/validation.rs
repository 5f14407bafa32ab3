//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//! - Check that header names, methods and path rules are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Custom detection patterns are not compiled here; the catalog skips
//!   invalid ones with a warning

use std::net::SocketAddr;

use hyper::header::HeaderName;
use hyper::{Method, Uri};
use thiserror::Error;

use crate::config::schema::ServiceConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    let upstream = format!("http://{}", config.upstream.address);
    match upstream.parse::<Uri>() {
        Ok(uri) if uri.authority().is_some() && uri.path() == "/" => {}
        _ => errors.push(ValidationError::new(
            "upstream.address",
            format!("'{}' is not a host:port authority", config.upstream.address),
        )),
    }

    for (field, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.idle_secs", config.timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    validate_sanitizer(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_sanitizer(config: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    let s = &config.sanitizer;

    for (field, value) in [
        ("sanitizer.max_request_body_size", s.max_request_body_size),
        ("sanitizer.max_text_field_length", s.max_text_field_length),
        ("sanitizer.max_header_value_length", s.max_header_value_length),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let prefix = &s.default_country_prefix;
    let digits = prefix.strip_prefix('+').unwrap_or("");
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        errors.push(ValidationError::new(
            "sanitizer.default_country_prefix",
            format!("'{prefix}' must be '+' followed by 1-4 digits"),
        ));
    }

    for method in &s.excluded_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "sanitizer.excluded_methods",
                format!("'{method}' is not an HTTP method"),
            ));
        }
    }

    for header in &s.inspected_headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "sanitizer.inspected_headers",
                format!("'{header}' is not a header name"),
            ));
        }
    }

    for prefix in &s.excluded_paths.prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                "sanitizer.excluded_paths.prefixes",
                format!("'{prefix}' must start with '/'"),
            ));
        }
    }

    for ext in &s.excluded_paths.extensions {
        if ext.is_empty() || ext.contains('/') {
            errors.push(ValidationError::new(
                "sanitizer.excluded_paths.extensions",
                format!("'{ext}' is not a file extension"),
            ));
        }
    }
}
