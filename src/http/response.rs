//! Client-facing error responses.
//!
//! # Responsibilities
//! - Render pipeline blocks as a 400 JSON body
//! - Map upstream failures to 502
//!
//! # Design Decisions
//! - Detection details are opt-in; by default a block reveals only its category
//! - The body never echoes request input

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detection::{InjectionClass, InjectionDetectionResult, RiskLevel};
use crate::policy::BlockReason;

/// Detection summary included when the policy allows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub injection_type: Option<InjectionClass>,
    pub risk_level: RiskLevel,
    pub detected_patterns: Vec<String>,
}

impl From<&InjectionDetectionResult> for ErrorDetails {
    fn from(result: &InjectionDetectionResult) -> Self {
        Self {
            injection_type: result.injection_type,
            risk_level: result.risk_level,
            detected_patterns: result.detected_patterns.clone(),
        }
    }
}

/// Body of a 400 block response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(reason: BlockReason) -> Self {
        Self {
            error: reason.error_code(),
            message: reason.message(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Response for a failed upstream exchange.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}
