//! Per-call sanitization options.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// HTML handling level applied when `allow_html` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlLevel {
    /// Remove every tag.
    #[default]
    Strip,
    /// Simple formatting tags only.
    Basic,
    /// Basic plus lists, links, images, tables and code.
    Standard,
    /// Everything except a known dangerous set.
    Relaxed,
    /// Encode all markup characters.
    Strict,
}

/// A blacklisted pattern, compiled once.
///
/// A source that does not compile is kept for diagnostics and skipped at
/// sanitization time.
#[derive(Debug, Clone)]
pub struct BlacklistedPattern {
    source: String,
    compiled: Option<Regex>,
}

impl BlacklistedPattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %source, error = %e, "Blacklisted pattern does not compile");
                None
            }
        };
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.compiled.as_ref()
    }
}

/// Options driving `sanitize_text`.
#[derive(Debug, Clone)]
pub struct SanitizationOptions {
    /// Maximum output length in characters.
    pub max_length: Option<usize>,
    pub allow_html: bool,
    pub html_level: HtmlLevel,
    pub remove_line_breaks: bool,
    pub normalize_whitespace: bool,
    pub remove_control_characters: bool,
    pub blacklisted_characters: BTreeSet<char>,
    pub blacklisted_patterns: Vec<BlacklistedPattern>,
}

impl Default for SanitizationOptions {
    fn default() -> Self {
        Self {
            max_length: None,
            allow_html: false,
            html_level: HtmlLevel::Strip,
            remove_line_breaks: false,
            normalize_whitespace: true,
            remove_control_characters: true,
            blacklisted_characters: BTreeSet::new(),
            blacklisted_patterns: Vec::new(),
        }
    }
}

impl SanitizationOptions {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_html(mut self, level: HtmlLevel) -> Self {
        self.allow_html = true;
        self.html_level = level;
        self
    }

    pub fn without_html(mut self) -> Self {
        self.allow_html = false;
        self
    }

    pub fn remove_line_breaks(mut self, enabled: bool) -> Self {
        self.remove_line_breaks = enabled;
        self
    }

    pub fn normalize_whitespace(mut self, enabled: bool) -> Self {
        self.normalize_whitespace = enabled;
        self
    }

    pub fn remove_control_characters(mut self, enabled: bool) -> Self {
        self.remove_control_characters = enabled;
        self
    }

    pub fn blacklist_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.blacklisted_characters.extend(chars);
        self
    }

    pub fn blacklist_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.blacklisted_patterns.push(BlacklistedPattern::new(pattern));
        self
    }
}
