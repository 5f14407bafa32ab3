use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use input_shield::config::{load_config, SanitizerConfig};
use input_shield::detection::{InjectionDetector, PatternCatalog};
use input_shield::sanitize::{
    sanitize_email, sanitize_file_path, sanitize_phone_number, sanitize_text, sanitize_url,
    validate, FieldError, FieldProfiles, RequiredFormat, ValidationRules,
};

#[derive(Parser)]
#[command(name = "shield-cli")]
#[command(about = "Offline inspection tools for input-shield", long_about = None)]
struct Cli {
    /// Configuration file supplying custom patterns and sanitizer settings
    #[arg(short, long, env = "INPUT_SHIELD_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a value against the pattern catalog
    Detect { value: String },
    /// Sanitize a value the way the proxy would for a named field
    Sanitize {
        value: String,
        /// Field name used to pick the sanitization profile
        #[arg(short, long, default_value = "value")]
        field: String,
    },
    /// Run a specialized field sanitizer
    Field {
        #[arg(value_enum)]
        kind: FieldKind,
        value: String,
    },
    /// Check a value against a required format and length bounds
    Validate {
        value: String,
        #[arg(short, long, value_enum)]
        format: Option<Format>,
        #[arg(long)]
        min: Option<usize>,
        #[arg(long)]
        max: Option<usize>,
    },
    /// Load and validate a configuration file
    CheckConfig { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldKind {
    Email,
    Phone,
    Url,
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
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

impl From<Format> for RequiredFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Email => RequiredFormat::Email,
            Format::Phone => RequiredFormat::Phone,
            Format::Url => RequiredFormat::Url,
            Format::IpAddress => RequiredFormat::IpAddress,
            Format::AlphaNumeric => RequiredFormat::AlphaNumeric,
            Format::Numeric => RequiredFormat::Numeric,
            Format::Alpha => RequiredFormat::Alpha,
            Format::Base64 => RequiredFormat::Base64,
            Format::Json => RequiredFormat::Json,
            Format::Uuid => RequiredFormat::Uuid,
            Format::DateTime => RequiredFormat::DateTime,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok((output, ok)) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns the JSON report and whether the check passed.
fn run(cli: Cli) -> Result<(Value, bool), Box<dyn std::error::Error>> {
    let policy = match &cli.config {
        Some(path) => load_config(path)?.sanitizer,
        None => SanitizerConfig::default(),
    };

    match cli.command {
        Commands::Detect { value } => {
            let catalog = PatternCatalog::with_custom_patterns(&policy.custom_patterns);
            let result = InjectionDetector::new(Arc::new(catalog)).detect(&value);
            let blocking = policy.block_on_injection_detection
                && result.meets(policy.blocking_risk_threshold);
            let mut output = serde_json::to_value(&result)?;
            output["wouldBlock"] = json!(blocking);
            Ok((output, !result.detected))
        }
        Commands::Sanitize { value, field } => {
            let profiles = FieldProfiles::from_policy(&policy);
            let (profile, options) = profiles.for_field(&field);
            let sanitized = sanitize_text(&value, options);
            Ok((
                json!({ "field": field, "profile": profile, "changed": sanitized != value, "value": sanitized }),
                true,
            ))
        }
        Commands::Field { kind, value } => {
            let result = match kind {
                FieldKind::Email => sanitize_email(&value),
                FieldKind::Phone => sanitize_phone_number(&value, &policy.default_country_prefix),
                FieldKind::Url => sanitize_url(&value),
                FieldKind::Path => sanitize_file_path(&value),
            };
            Ok(field_report(result))
        }
        Commands::Validate { value, format, min, max } => {
            let mut rules = ValidationRules::new().length(min, max);
            if let Some(format) = format {
                rules = rules.format(format.into());
            }
            match validate(&value, &rules) {
                Ok(()) => Ok((json!({ "valid": true }), true)),
                Err(violations) => {
                    let messages: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                    Ok((json!({ "valid": false, "violations": messages }), false))
                }
            }
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => Ok((
                json!({
                    "valid": true,
                    "bindAddress": config.listener.bind_address,
                    "upstream": config.upstream.address,
                    "customPatterns": config.sanitizer.custom_patterns.len(),
                }),
                true,
            )),
            Err(e) => Ok((json!({ "valid": false, "error": e.to_string() }), false)),
        },
    }
}

fn field_report(result: Result<String, FieldError>) -> (Value, bool) {
    match result {
        Ok(value) => (json!({ "valid": true, "value": value }), true),
        Err(e) => (json!({ "valid": false, "error": e.to_string() }), false),
    }
}
