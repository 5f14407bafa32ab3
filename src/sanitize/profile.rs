//! Field-name-driven sanitization profiles.
//!
//! # Design Decisions
//! - Classification is a case-insensitive substring match; first rule wins
//! - Option sets are built once from `SanitizerConfig` and shared read-only

use serde::Serialize;

use crate::config::schema::SanitizerConfig;
use crate::sanitize::fields::{MAX_EMAIL_LENGTH, MAX_URL_LENGTH};
use crate::sanitize::options::{HtmlLevel, SanitizationOptions};

const MAX_PHONE_FIELD_LENGTH: usize = 20;
const MAX_NAME_FIELD_LENGTH: usize = 100;

/// Everything except digits, `+`, whitespace, `-`, `(`, `)` and `.`.
const PHONE_DISALLOWED: &str = r"[^0-9+\s\-().]";

/// Profile chosen for a field from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProfile {
    Email,
    Url,
    Phone,
    Name,
    LongText,
    Default,
}

impl FieldProfile {
    /// Pick a profile from a field name.
    pub fn classify(field_name: &str) -> Self {
        let name = field_name.to_lowercase();
        if name.contains("email") {
            FieldProfile::Email
        } else if name.contains("url") || name.contains("link") {
            FieldProfile::Url
        } else if name.contains("phone") {
            FieldProfile::Phone
        } else if name.contains("name") {
            FieldProfile::Name
        } else if name.contains("description") || name.contains("comment") {
            FieldProfile::LongText
        } else {
            FieldProfile::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldProfile::Email => "email",
            FieldProfile::Url => "url",
            FieldProfile::Phone => "phone",
            FieldProfile::Name => "name",
            FieldProfile::LongText => "long_text",
            FieldProfile::Default => "default",
        }
    }
}

/// Prebuilt option sets for every profile and request surface.
#[derive(Debug, Clone)]
pub struct FieldProfiles {
    email: SanitizationOptions,
    url: SanitizationOptions,
    phone: SanitizationOptions,
    name: SanitizationOptions,
    long_text: SanitizationOptions,
    default: SanitizationOptions,
    header: SanitizationOptions,
    xml_body: SanitizationOptions,
    text_body: SanitizationOptions,
}

impl FieldProfiles {
    pub fn from_policy(policy: &SanitizerConfig) -> Self {
        let base = SanitizationOptions::default().remove_control_characters(true);

        let long_text = if policy.allow_html_in_text_fields {
            base.clone()
                .with_max_length(policy.max_text_field_length)
                .with_html(HtmlLevel::Basic)
        } else {
            base.clone().with_max_length(policy.max_text_field_length)
        };

        Self {
            email: base
                .clone()
                .with_max_length(MAX_EMAIL_LENGTH)
                .blacklist_chars(['<', '>', '"', '\'']),
            url: base.clone().with_max_length(MAX_URL_LENGTH),
            phone: base
                .clone()
                .with_max_length(MAX_PHONE_FIELD_LENGTH)
                .blacklist_pattern(PHONE_DISALLOWED),
            name: base
                .clone()
                .with_max_length(MAX_NAME_FIELD_LENGTH)
                .blacklist_chars(['<', '>', '"', '\'', '&']),
            long_text,
            default: base.clone().with_max_length(policy.max_text_field_length),
            header: base
                .clone()
                .with_max_length(policy.max_header_value_length)
                .remove_line_breaks(true),
            xml_body: base
                .clone()
                .with_max_length(policy.max_request_body_size)
                .with_html(HtmlLevel::Relaxed)
                .normalize_whitespace(false),
            text_body: base.with_max_length(policy.max_request_body_size),
        }
    }

    pub fn options(&self, profile: FieldProfile) -> &SanitizationOptions {
        match profile {
            FieldProfile::Email => &self.email,
            FieldProfile::Url => &self.url,
            FieldProfile::Phone => &self.phone,
            FieldProfile::Name => &self.name,
            FieldProfile::LongText => &self.long_text,
            FieldProfile::Default => &self.default,
        }
    }

    /// Classify `field_name` and return its options.
    pub fn for_field(&self, field_name: &str) -> (FieldProfile, &SanitizationOptions) {
        let profile = FieldProfile::classify(field_name);
        (profile, self.options(profile))
    }

    /// Header values: capped, single line, no field-name heuristics.
    pub fn header(&self) -> &SanitizationOptions {
        &self.header
    }

    pub fn xml_body(&self) -> &SanitizationOptions {
        &self.xml_body
    }

    pub fn text_body(&self) -> &SanitizationOptions {
        &self.text_body
    }
}

impl Default for FieldProfiles {
    fn default() -> Self {
        Self::from_policy(&SanitizerConfig::default())
    }
}
