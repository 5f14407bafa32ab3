//! Request sanitization middleware.
//!
//! # Responsibilities
//! - Decide whether a request is inspected at all (enabled flag, exclusions)
//! - Buffer the body under a hard size limit before any pattern runs
//! - Feed every query parameter, allow-listed header and body value through
//!   detection and sanitization
//! - Forward the rebuilt request or short-circuit with a 400
//! - Emit audit events and metrics for detections, errors and blocks
//!
//! # Data Flow
//! ```text
//! Request
//!     → skip? ─────────────────────────────────────▶ next (untouched)
//!     → Content-Length / Limited buffering (oversized → policy)
//!     → query → headers → body (ContentStrategy)
//!         each value: detect → decide → sanitize unless blocking
//!     → blocking? ─────────────────────────────────▶ 400 ErrorResponse
//!     → rebuild (URI, headers, body, Content-Length) → next
//! ```
//!
//! # Design Decisions
//! - Nothing is written back until every surface has been processed; a
//!   dropped future leaves no partial state
//! - A surface that fails to rebuild is forwarded as it arrived
//! - Surfaces whose values did not change keep their original bytes

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING},
        request::Parts,
        uri::PathAndQuery,
        HeaderMap, HeaderName, HeaderValue, Request, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::config::schema::SanitizerConfig;
use crate::detection::{InjectionDetectionResult, InjectionDetector, PatternCatalog};
use crate::error::PipelineError;
use crate::http::request::request_id;
use crate::http::response::ErrorResponse;
use crate::observability::audit::{AuditContext, AuditEvent, AuditEventType, AuditSink};
use crate::observability::metrics;
use crate::policy::outcome::error_severity;
use crate::policy::{decide_detection, decide_error, BlockReason, ExclusionRules, Outcome};
use crate::sanitize::{sanitize_for_log, sanitize_text, FieldProfiles};
use crate::surface::{
    self, headers, urlencoded, ContentStrategy, RequestSurfaceLocation, SurfaceField,
    ValueInspector,
};

/// Result of running the pipeline over one request.
#[derive(Debug)]
pub enum Verdict {
    Forward { request: Request<Body>, outcome: Outcome },
    Reject { response: Response, outcome: Outcome },
}

/// Everything the middleware needs, built once at startup.
pub struct SanitizationPipeline {
    policy: Arc<SanitizerConfig>,
    detector: InjectionDetector,
    profiles: FieldProfiles,
    exclusions: ExclusionRules,
    inspected_headers: Vec<HeaderName>,
    audit: Arc<dyn AuditSink>,
}

impl SanitizationPipeline {
    /// Build the pipeline with the built-in catalog plus configured patterns.
    pub fn new(policy: Arc<SanitizerConfig>, audit: Arc<dyn AuditSink>) -> Self {
        let catalog = Arc::new(PatternCatalog::with_custom_patterns(&policy.custom_patterns));
        Self::with_catalog(policy, catalog, audit)
    }

    pub fn with_catalog(
        policy: Arc<SanitizerConfig>,
        catalog: Arc<PatternCatalog>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let inspected_headers = policy
            .inspected_headers
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.trim().as_bytes()) {
                Ok(header) => Some(header),
                Err(e) => {
                    tracing::warn!(header = %name, error = %e, "Ignoring invalid inspected header");
                    None
                }
            })
            .collect();

        Self {
            detector: InjectionDetector::new(catalog),
            profiles: FieldProfiles::from_policy(&policy),
            exclusions: ExclusionRules::from_policy(&policy),
            inspected_headers,
            audit,
            policy,
        }
    }

    pub fn policy(&self) -> &SanitizerConfig {
        &self.policy
    }

    /// Run the pipeline over `request`.
    pub async fn process(&self, request: Request<Body>) -> Verdict {
        if !self.policy.enabled || self.exclusions.skips_request(&request) {
            return Verdict::Forward {
                request,
                outcome: Outcome::Skip,
            };
        }

        let strategy = if self.exclusions.skips_body(&request) {
            None
        } else {
            request
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(ContentStrategy::from_content_type)
        };

        let (mut parts, body) = request.into_parts();
        let mut scope = RequestScope::new(self, &parts);

        // Buffering comes first: an oversized body must never reach a matcher.
        let limit = self.policy.max_request_body_size;
        let pending = match strategy {
            None => PendingBody::Untouched(body),
            Some(_) if declared_length(&parts.headers).is_some_and(|len| len > limit as u64) => {
                scope.error(PipelineError::OversizedBody { limit, declared: true }, None);
                if scope.outcome.is_blocking() {
                    return scope.reject();
                }
                PendingBody::Untouched(body)
            }
            Some(strategy) => match Limited::new(body, limit).collect().await {
                Ok(collected) => PendingBody::Buffered(strategy, collected.to_bytes()),
                Err(e) => {
                    let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                        PipelineError::OversizedBody { limit, declared: false }
                    } else {
                        PipelineError::BodyRead(e.to_string())
                    };
                    scope.error(err, None);
                    return scope.reject();
                }
            },
        };

        if let Some(query) = parts.uri.query() {
            if let Some(rewritten) = urlencoded::rewrite_query(query, &mut scope) {
                match with_query(&parts.uri, &rewritten) {
                    Ok(uri) => parts.uri = uri,
                    Err(err) => scope.error(err, Some(RequestSurfaceLocation::QueryParameter)),
                }
            }
        }
        if scope.outcome.is_blocking() {
            return scope.reject();
        }

        let (_, header_errors) =
            headers::rewrite_headers(&mut parts.headers, &self.inspected_headers, &mut scope);
        for err in header_errors {
            scope.error(err, Some(RequestSurfaceLocation::Header));
        }
        if scope.outcome.is_blocking() {
            return scope.reject();
        }

        let body = match pending {
            PendingBody::Untouched(body) => body,
            PendingBody::Buffered(strategy, bytes) => {
                match surface::rewrite_body(strategy, &bytes, &mut scope) {
                    Ok(Some(rewritten)) => {
                        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
                        parts.headers.remove(TRANSFER_ENCODING);
                        Body::from(rewritten)
                    }
                    Ok(None) => Body::from(bytes),
                    Err(err) => {
                        scope.error(err, Some(body_location(strategy)));
                        Body::from(bytes)
                    }
                }
            }
        };
        if scope.outcome.is_blocking() {
            return scope.reject();
        }

        let outcome = scope.outcome;
        tracing::debug!(
            request_id = scope.context.request_id.as_deref().unwrap_or("unknown"),
            outcome = outcome.as_str(),
            "Request inspected"
        );
        Verdict::Forward {
            request: Request::from_parts(parts, body),
            outcome,
        }
    }
}

enum PendingBody {
    Untouched(Body),
    Buffered(ContentStrategy, Bytes),
}

/// Per-request state; also the `ValueInspector` handed to every decomposer.
struct RequestScope<'p> {
    pipeline: &'p SanitizationPipeline,
    context: AuditContext,
    outcome: Outcome,
    /// Highest-risk detection seen so far.
    worst: Option<InjectionDetectionResult>,
    /// First error that asked for a block.
    blocking_error: Option<BlockReason>,
}

impl<'p> RequestScope<'p> {
    fn new(pipeline: &'p SanitizationPipeline, parts: &Parts) -> Self {
        Self {
            pipeline,
            context: AuditContext {
                request_id: request_id(&parts.headers),
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                ..AuditContext::default()
            },
            outcome: Outcome::Clean,
            worst: None,
            blocking_error: None,
        }
    }

    fn error(&mut self, err: PipelineError, location: Option<RequestSurfaceLocation>) {
        let outcome = decide_error(&err, &self.pipeline.policy);
        metrics::record_pipeline_error(err.kind());
        self.pipeline.audit.report_event(AuditEvent::new(
            AuditEventType::PipelineError,
            error_severity(outcome),
            AuditContext {
                location,
                detail: Some(err.to_string()),
                ..self.context.clone()
            },
        ));
        if outcome.is_blocking() && self.blocking_error.is_none() {
            self.blocking_error = Some(BlockReason::from_error(&err));
        }
        self.outcome = self.outcome.combine(outcome);
    }

    fn detection(&mut self, field: &SurfaceField, value: &str, result: InjectionDetectionResult) {
        let policy = &self.pipeline.policy;
        if let Some(class) = result.injection_type {
            metrics::record_detection(class.as_str(), result.risk_level.as_str(), field.location.as_str());
        }
        if policy.log_injection_attempts {
            self.pipeline.audit.report_event(AuditEvent::new(
                AuditEventType::InjectionDetected,
                result.risk_level,
                AuditContext {
                    location: Some(field.location),
                    field: Some(field.path.clone()),
                    injection_type: result.injection_type,
                    confidence: Some(result.confidence_score),
                    raw_value: policy.log_sensitive_raw_value.then(|| sanitize_for_log(value)),
                    ..self.context.clone()
                },
            ));
        }

        self.outcome = self.outcome.combine(decide_detection(&result, policy));
        let worse = self
            .worst
            .as_ref()
            .map_or(true, |worst| result.risk_level > worst.risk_level);
        if worse {
            self.worst = Some(result);
        }
    }

    fn reject(self) -> Verdict {
        let reason = if self.outcome == Outcome::FlaggedBlocking {
            BlockReason::Injection
        } else {
            self.blocking_error.unwrap_or(BlockReason::SanitizationFailure)
        };
        let detection = self.worst.as_ref().filter(|_| reason == BlockReason::Injection);

        metrics::record_blocked(reason.as_str());
        self.pipeline.audit.report_event(AuditEvent::new(
            AuditEventType::RequestBlocked,
            detection.map(|d| d.risk_level).unwrap_or_else(|| error_severity(self.outcome)),
            AuditContext {
                injection_type: detection.and_then(|d| d.injection_type),
                detail: Some(reason.as_str().to_string()),
                ..self.context.clone()
            },
        ));

        let mut body = ErrorResponse::new(reason);
        if self.pipeline.policy.include_detection_details_in_error_response {
            if let Some(detection) = detection {
                body = body.with_details(detection.into());
            }
        }
        Verdict::Reject {
            response: body.into_response(),
            outcome: self.outcome,
        }
    }
}

impl ValueInspector for RequestScope<'_> {
    fn inspect(&mut self, field: &SurfaceField, value: &str) -> String {
        let result = self.pipeline.detector.detect(value);
        if result.detected {
            self.detection(field, value, result);
        }
        if self.outcome.is_blocking() {
            return value.to_string();
        }
        sanitize_text(value, field.options(&self.pipeline.profiles))
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn with_query(uri: &Uri, query: &str) -> Result<Uri, PipelineError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| PipelineError::SanitizationFailure(format!("query: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| PipelineError::SanitizationFailure(format!("uri: {e}")))
}

fn body_location(strategy: ContentStrategy) -> RequestSurfaceLocation {
    match strategy {
        ContentStrategy::Json => RequestSurfaceLocation::JsonBody,
        ContentStrategy::Xml => RequestSurfaceLocation::XmlBody,
        ContentStrategy::Form => RequestSurfaceLocation::FormField,
        ContentStrategy::Text => RequestSurfaceLocation::TextBody,
    }
}

/// Axum middleware entry point, installed with `from_fn_with_state`.
pub async fn sanitize_request(
    State(pipeline): State<Arc<SanitizationPipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    match pipeline.process(request).await {
        Verdict::Forward { request, outcome } => {
            let response = next.run(request).await;
            metrics::record_request(&method, response.status().as_u16(), outcome.as_str(), start);
            response
        }
        Verdict::Reject { response, outcome } => {
            metrics::record_request(&method, response.status().as_u16(), outcome.as_str(), start);
            response
        }
    }
}
