//! Per-request decision state.
//!
//! # State Machine
//! ```text
//! Skip ─────────────────────────────────────────────▶ forward untouched
//! Inspecting ─┬─ nothing found ─────────────────────▶ Clean (forward)
//!             ├─ detection ≥ threshold, blocking ───▶ FlaggedBlocking (400)
//!             ├─ detection, not blocking ───────────▶ FlaggedNonBlocking (sanitize, forward)
//!             ├─ pipeline error, blocking ──────────▶ ErrorBlocking (400)
//!             └─ pipeline error, not blocking ──────▶ ErrorNonBlocking (forward surface as-is)
//! ```
//!
//! Several surfaces feed one request; `Outcome::combine` keeps the most
//! severe state so any blocking signal wins.

use crate::config::schema::SanitizerConfig;
use crate::detection::{InjectionDetectionResult, RiskLevel};
use crate::error::PipelineError;

/// Outcome of the pipeline for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Excluded or disabled; nothing inspected.
    Skip,
    #[default]
    Clean,
    FlaggedBlocking,
    FlaggedNonBlocking,
    ErrorBlocking,
    ErrorNonBlocking,
}

impl Outcome {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Outcome::FlaggedBlocking | Outcome::ErrorBlocking)
    }

    fn rank(&self) -> u8 {
        match self {
            Outcome::Skip => 0,
            Outcome::Clean => 1,
            Outcome::ErrorNonBlocking => 2,
            Outcome::FlaggedNonBlocking => 3,
            Outcome::ErrorBlocking => 4,
            Outcome::FlaggedBlocking => 5,
        }
    }

    /// The more severe of two outcomes.
    pub fn combine(self, other: Outcome) -> Outcome {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Skip => "skip",
            Outcome::Clean => "clean",
            Outcome::FlaggedBlocking => "flagged_blocking",
            Outcome::FlaggedNonBlocking => "flagged_non_blocking",
            Outcome::ErrorBlocking => "error_blocking",
            Outcome::ErrorNonBlocking => "error_non_blocking",
        }
    }
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Injection,
    OversizedBody,
    MalformedBody,
    SanitizationFailure,
    BodyRead,
}

impl BlockReason {
    pub fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::SanitizationFailure(_) => BlockReason::SanitizationFailure,
            PipelineError::MalformedStructuredBody { .. } => BlockReason::MalformedBody,
            PipelineError::OversizedBody { .. } => BlockReason::OversizedBody,
            PipelineError::BodyRead(_) => BlockReason::BodyRead,
        }
    }

    /// Machine-readable `error` field of the 400 response.
    pub fn error_code(&self) -> &'static str {
        match self {
            BlockReason::SanitizationFailure => "input_sanitization_failed",
            _ => "input_validation_failed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::Injection => "Request contains potentially malicious input",
            BlockReason::OversizedBody => "Request body exceeds the allowed size",
            BlockReason::MalformedBody => "Request body could not be parsed",
            BlockReason::SanitizationFailure => "Request input could not be sanitized",
            BlockReason::BodyRead => "Request body could not be read",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Injection => "injection",
            BlockReason::OversizedBody => "oversized_body",
            BlockReason::MalformedBody => "malformed_body",
            BlockReason::SanitizationFailure => "sanitization_failure",
            BlockReason::BodyRead => "body_read",
        }
    }
}

/// Decide the outcome for a single detection result.
pub fn decide_detection(result: &InjectionDetectionResult, policy: &SanitizerConfig) -> Outcome {
    if !result.detected {
        Outcome::Clean
    } else if policy.block_on_injection_detection && result.meets(policy.blocking_risk_threshold) {
        Outcome::FlaggedBlocking
    } else {
        Outcome::FlaggedNonBlocking
    }
}

/// Decide the outcome for a pipeline error.
///
/// A body found oversized while streaming, or one that failed to read, is
/// gone and can never be forwarded, so those always block.
pub fn decide_error(err: &PipelineError, policy: &SanitizerConfig) -> Outcome {
    let blocking = match err {
        PipelineError::SanitizationFailure(_) => policy.block_on_sanitization_error,
        PipelineError::MalformedStructuredBody { .. } => policy.block_on_invalid_structured_input,
        PipelineError::OversizedBody { declared: true, .. } => policy.block_on_oversized_body,
        PipelineError::OversizedBody { declared: false, .. } => true,
        PipelineError::BodyRead(_) => true,
    };
    if blocking {
        Outcome::ErrorBlocking
    } else {
        Outcome::ErrorNonBlocking
    }
}

/// Risk level used as audit severity for a pipeline error.
pub fn error_severity(outcome: Outcome) -> RiskLevel {
    if outcome.is_blocking() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::InjectionClass;

    fn detection(risk: RiskLevel) -> InjectionDetectionResult {
        InjectionDetectionResult {
            detected: true,
            injection_type: Some(InjectionClass::SqlInjection),
            risk_level: risk,
            detected_patterns: vec![],
            confidence_score: 20,
        }
    }

    #[test]
    fn test_detection_threshold() {
        let policy = SanitizerConfig::default();
        assert_eq!(decide_detection(&InjectionDetectionResult::clean(), &policy), Outcome::Clean);
        assert_eq!(decide_detection(&detection(RiskLevel::Medium), &policy), Outcome::FlaggedNonBlocking);
        assert_eq!(decide_detection(&detection(RiskLevel::High), &policy), Outcome::FlaggedBlocking);
        assert_eq!(decide_detection(&detection(RiskLevel::Critical), &policy), Outcome::FlaggedBlocking);
    }

    #[test]
    fn test_detection_blocking_disabled() {
        let policy = SanitizerConfig {
            block_on_injection_detection: false,
            ..SanitizerConfig::default()
        };
        assert_eq!(
            decide_detection(&detection(RiskLevel::Critical), &policy),
            Outcome::FlaggedNonBlocking
        );
    }

    #[test]
    fn test_error_flags_are_independent() {
        let policy = SanitizerConfig::default();
        let malformed = PipelineError::MalformedStructuredBody {
            content_type: "json".into(),
            reason: "eof".into(),
        };
        assert_eq!(decide_error(&malformed, &policy), Outcome::ErrorNonBlocking);
        assert_eq!(
            decide_error(&PipelineError::SanitizationFailure("x".into()), &policy),
            Outcome::ErrorNonBlocking
        );
        assert_eq!(
            decide_error(&PipelineError::OversizedBody { limit: 1, declared: true }, &policy),
            Outcome::ErrorBlocking
        );

        let lenient = SanitizerConfig {
            block_on_oversized_body: false,
            block_on_invalid_structured_input: true,
            ..SanitizerConfig::default()
        };
        assert_eq!(decide_error(&malformed, &lenient), Outcome::ErrorBlocking);
        assert_eq!(
            decide_error(&PipelineError::OversizedBody { limit: 1, declared: true }, &lenient),
            Outcome::ErrorNonBlocking
        );
        // Mid-stream overflow and read failures cannot be forwarded.
        assert_eq!(
            decide_error(&PipelineError::OversizedBody { limit: 1, declared: false }, &lenient),
            Outcome::ErrorBlocking
        );
        assert_eq!(
            decide_error(&PipelineError::BodyRead("reset".into()), &lenient),
            Outcome::ErrorBlocking
        );
    }

    #[test]
    fn test_combine_keeps_most_severe() {
        assert_eq!(Outcome::Clean.combine(Outcome::FlaggedNonBlocking), Outcome::FlaggedNonBlocking);
        assert_eq!(Outcome::FlaggedBlocking.combine(Outcome::ErrorNonBlocking), Outcome::FlaggedBlocking);
        assert_eq!(Outcome::ErrorNonBlocking.combine(Outcome::ErrorBlocking), Outcome::ErrorBlocking);
        assert!(!Outcome::Clean.combine(Outcome::Clean).is_blocking());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BlockReason::Injection.error_code(), "input_validation_failed");
        assert_eq!(BlockReason::OversizedBody.error_code(), "input_validation_failed");
        assert_eq!(BlockReason::MalformedBody.error_code(), "input_validation_failed");
        assert_eq!(BlockReason::SanitizationFailure.error_code(), "input_sanitization_failed");
    }
}
