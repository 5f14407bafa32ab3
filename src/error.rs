//! Pipeline error taxonomy.
//!
//! A detection match is not an error; it is a policy signal handled by
//! `policy::outcome`. These errors cover the cases where the pipeline could
//! not inspect or rebuild part of a request.

use thiserror::Error;

/// Failure while inspecting or rebuilding a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A sanitized value could not be re-encoded (header value, URI, JSON).
    #[error("sanitization failed: {0}")]
    SanitizationFailure(String),

    /// The body does not parse as its declared content type.
    #[error("malformed {content_type} body: {reason}")]
    MalformedStructuredBody { content_type: String, reason: String },

    /// The body exceeds the configured limit.
    ///
    /// `declared` is true when the limit was crossed by `Content-Length`
    /// before any byte was read.
    #[error("request body exceeds {limit} bytes")]
    OversizedBody { limit: usize, declared: bool },

    /// The client aborted or the transport failed while buffering.
    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

impl PipelineError {
    /// Label used for metrics and audit events.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SanitizationFailure(_) => "sanitization_failure",
            PipelineError::MalformedStructuredBody { .. } => "malformed_structured_body",
            PipelineError::OversizedBody { .. } => "oversized_body",
            PipelineError::BodyRead(_) => "body_read",
        }
    }
}
