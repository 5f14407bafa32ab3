//! Structural decomposition of request surfaces.
//!
//! # Data Flow
//! ```text
//! query string ─┐
//! form body ────┴─ urlencoded.rs ─┐
//! headers ──────── headers.rs ────┤
//! JSON body ────── json.rs ───────┼─▶ ValueInspector::inspect(field, value)
//! XML/text body ── opaque.rs ─────┘        → replacement value
//!     → each decomposer rebuilds its surface from the replacements
//! ```
//!
//! # Design Decisions
//! - Decomposers only extract and rebuild; detection, sanitization and
//!   policy live behind `ValueInspector`
//! - One `ContentStrategy` per body instead of parallel pipelines

pub mod headers;
pub mod json;
pub mod opaque;
pub mod urlencoded;

use serde::Serialize;
use std::fmt;

use crate::error::PipelineError;
use crate::policy::exclusion::media_type;
use crate::sanitize::{FieldProfile, FieldProfiles, SanitizationOptions};

/// Where in the request a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSurfaceLocation {
    QueryParameter,
    Header,
    JsonBody,
    XmlBody,
    TextBody,
    FormField,
}

impl RequestSurfaceLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestSurfaceLocation::QueryParameter => "query_parameter",
            RequestSurfaceLocation::Header => "header",
            RequestSurfaceLocation::JsonBody => "json_body",
            RequestSurfaceLocation::XmlBody => "xml_body",
            RequestSurfaceLocation::TextBody => "text_body",
            RequestSurfaceLocation::FormField => "form_field",
        }
    }
}

impl fmt::Display for RequestSurfaceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context for one inspected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceField {
    pub location: RequestSurfaceLocation,
    /// Name used for profile selection (nearest key, header or parameter name).
    pub name: String,
    /// Full path for diagnostics, e.g. `user.emails[0]`.
    pub path: String,
}

impl SurfaceField {
    pub fn new(location: RequestSurfaceLocation, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location,
            path: name.clone(),
            name,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Profile chosen for this field, if the location uses name heuristics.
    pub fn profile(&self) -> Option<FieldProfile> {
        match self.location {
            RequestSurfaceLocation::QueryParameter
            | RequestSurfaceLocation::FormField
            | RequestSurfaceLocation::JsonBody => Some(FieldProfile::classify(&self.name)),
            _ => None,
        }
    }

    /// Sanitization options for this field.
    pub fn options<'p>(&self, profiles: &'p FieldProfiles) -> &'p SanitizationOptions {
        match self.location {
            RequestSurfaceLocation::Header => profiles.header(),
            RequestSurfaceLocation::XmlBody => profiles.xml_body(),
            RequestSurfaceLocation::TextBody => profiles.text_body(),
            _ => profiles.for_field(&self.name).1,
        }
    }
}

/// Receives every extracted value and returns its replacement.
pub trait ValueInspector {
    fn inspect(&mut self, field: &SurfaceField, value: &str) -> String;
}

/// How a request body is decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStrategy {
    Json,
    Xml,
    Form,
    Text,
}

impl ContentStrategy {
    /// Pick a strategy from a `Content-Type` value; `None` means forward as-is.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = media_type(content_type);
        let (kind, subtype) = essence.split_once('/')?;

        if essence == "application/json" || subtype.ends_with("+json") {
            Some(ContentStrategy::Json)
        } else if essence == "application/xml" || essence == "text/xml" || subtype.ends_with("+xml") {
            Some(ContentStrategy::Xml)
        } else if essence == "application/x-www-form-urlencoded" {
            Some(ContentStrategy::Form)
        } else if kind == "text" {
            Some(ContentStrategy::Text)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStrategy::Json => "json",
            ContentStrategy::Xml => "xml",
            ContentStrategy::Form => "form",
            ContentStrategy::Text => "text",
        }
    }
}

/// Decompose a buffered body and rebuild it from inspected values.
///
/// Returns `Ok(None)` when no value changed, so the original bytes can be
/// forwarded untouched.
pub fn rewrite_body(
    strategy: ContentStrategy,
    body: &[u8],
    inspector: &mut impl ValueInspector,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let rewritten = match strategy {
        ContentStrategy::Json => return json::rewrite_json(body, inspector),
        ContentStrategy::Form => urlencoded::rewrite_form(utf8(body, strategy)?, inspector),
        ContentStrategy::Xml => opaque::rewrite_xml(utf8(body, strategy)?, inspector),
        ContentStrategy::Text => opaque::rewrite_text(utf8(body, strategy)?, inspector),
    };
    Ok(rewritten.map(String::into_bytes))
}

fn utf8(body: &[u8], strategy: ContentStrategy) -> Result<&str, PipelineError> {
    std::str::from_utf8(body).map_err(|e| PipelineError::MalformedStructuredBody {
        content_type: strategy.as_str().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every call and upper-cases values.
    #[derive(Default)]
    pub struct RecordingInspector {
        pub seen: Vec<(SurfaceField, String)>,
    }

    impl ValueInspector for RecordingInspector {
        fn inspect(&mut self, field: &SurfaceField, value: &str) -> String {
            self.seen.push((field.clone(), value.to_string()));
            value.to_uppercase()
        }
    }
}
