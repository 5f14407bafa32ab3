//! Field-aware sanitization.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     SanitizerConfig → profile.rs (FieldProfiles, built once)
//!
//! Per value:
//!     field name → FieldProfile::classify → SanitizationOptions
//!     value + options → text.rs (control chars, html.rs, whitespace,
//!                                blacklists, truncation)
//! ```
//!
//! # Responsibilities
//! - Option-driven text sanitization (`sanitize_text`)
//! - Specialized validators for emails, phones, URLs and file paths
//! - Declarative rule validation and typed contract sanitization

pub mod contract;
pub mod fields;
pub mod html;
pub mod options;
pub mod profile;
pub mod rules;
pub mod text;

pub use contract::{sanitize_contract, FieldRef, Sanitizable};
pub use fields::{sanitize_email, sanitize_file_path, sanitize_phone_number, sanitize_url, FieldError};
pub use options::{BlacklistedPattern, HtmlLevel, SanitizationOptions};
pub use profile::{FieldProfile, FieldProfiles};
pub use rules::{validate, RequiredFormat, RuleViolation, ValidationRules};
pub use text::{sanitize_for_log, sanitize_text};
