//! Configuration loading from disk and environment.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides, e.g. `INPUT_SHIELD_ENABLED=false`.
pub const ENV_PREFIX: &str = "INPUT_SHIELD_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: String, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, message } => write!(f, "Invalid {}: {}", key, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse configuration text without validating it.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load the file (or defaults), apply process environment overrides and validate.
pub fn load_with_env(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Override scalar settings from `INPUT_SHIELD_<FIELD>` variables.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    override_with(&lookup, "BIND_ADDRESS", &mut config.listener.bind_address)?;
    override_with(&lookup, "UPSTREAM_ADDRESS", &mut config.upstream.address)?;
    override_with(&lookup, "LOG_LEVEL", &mut config.observability.log_level)?;

    let s = &mut config.sanitizer;
    override_with(&lookup, "ENABLED", &mut s.enabled)?;
    override_with(&lookup, "BLOCK_ON_INJECTION_DETECTION", &mut s.block_on_injection_detection)?;
    override_with(&lookup, "BLOCKING_RISK_THRESHOLD", &mut s.blocking_risk_threshold)?;
    override_with(&lookup, "BLOCK_ON_SANITIZATION_ERROR", &mut s.block_on_sanitization_error)?;
    override_with(
        &lookup,
        "BLOCK_ON_INVALID_STRUCTURED_INPUT",
        &mut s.block_on_invalid_structured_input,
    )?;
    override_with(&lookup, "BLOCK_ON_OVERSIZED_BODY", &mut s.block_on_oversized_body)?;
    override_with(&lookup, "MAX_REQUEST_BODY_SIZE", &mut s.max_request_body_size)?;
    override_with(&lookup, "MAX_TEXT_FIELD_LENGTH", &mut s.max_text_field_length)?;
    override_with(&lookup, "MAX_HEADER_VALUE_LENGTH", &mut s.max_header_value_length)?;
    override_with(&lookup, "LOG_INJECTION_ATTEMPTS", &mut s.log_injection_attempts)?;
    override_with(&lookup, "LOG_SENSITIVE_RAW_VALUE", &mut s.log_sensitive_raw_value)?;
    override_with(
        &lookup,
        "INCLUDE_DETECTION_DETAILS_IN_ERROR_RESPONSE",
        &mut s.include_detection_details_in_error_response,
    )?;
    override_with(&lookup, "ALLOW_HTML_IN_TEXT_FIELDS", &mut s.allow_html_in_text_fields)?;
    override_with(&lookup, "DEFAULT_COUNTRY_PREFIX", &mut s.default_country_prefix)?;

    Ok(())
}

fn override_with<T, F>(lookup: &F, field: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{ENV_PREFIX}{field}");
    if let Some(raw) = lookup(&key) {
        *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            key: key.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(key = %key, "Applied environment override");
    }
    Ok(())
}
