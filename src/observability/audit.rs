//! Security audit events.
//!
//! # Responsibilities
//! - Describe detections, blocks and pipeline errors as structured events
//! - Deliver them to a pluggable sink without delaying the request
//!
//! # Design Decisions
//! - `report_event` is synchronous and infallible; sinks drop rather than wait
//! - Raw input never appears in an event unless explicitly enabled, and then
//!   only after log escaping

use serde::Serialize;
use tokio::sync::mpsc;

use crate::detection::{InjectionClass, RiskLevel};
use crate::observability::metrics;
use crate::surface::RequestSurfaceLocation;

/// Category of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    InjectionDetected,
    RequestBlocked,
    PipelineError,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::InjectionDetected => "injection_detected",
            AuditEventType::RequestBlocked => "request_blocked",
            AuditEventType::PipelineError => "pipeline_error",
        }
    }
}

/// Request context attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<RequestSurfaceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection_type: Option<InjectionClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    /// Block reason or error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Log-escaped raw value; only set when raw logging is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
}

/// A single audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub severity: RiskLevel,
    pub context: AuditContext,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, severity: RiskLevel, context: AuditContext) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            severity,
            context,
        }
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Fire-and-forget; must not block or fail the caller.
    fn report_event(&self, event: AuditEvent);
}

/// Writes events as structured `tracing` records and counts them.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn report_event(&self, event: AuditEvent) {
        metrics::record_audit_event(event.event_type.as_str());

        let ctx = &event.context;
        let request_id = ctx.request_id.as_deref().unwrap_or("unknown");
        let location = ctx.location.map(|l| l.as_str()).unwrap_or("-");
        let field = ctx.field.as_deref().unwrap_or("-");
        let injection_type = ctx.injection_type.map(|c| c.as_str()).unwrap_or("-");
        let detail = ctx.detail.as_deref().unwrap_or("");

        match event.event_type {
            AuditEventType::InjectionDetected => tracing::warn!(
                event_id = %event.id,
                request_id = %request_id,
                method = %ctx.method,
                path = %ctx.path,
                location = %location,
                field = %field,
                injection_type = %injection_type,
                risk_level = %event.severity,
                confidence = ctx.confidence.unwrap_or(0),
                raw_value = ctx.raw_value.as_deref(),
                "Injection attempt detected"
            ),
            AuditEventType::RequestBlocked => tracing::warn!(
                event_id = %event.id,
                request_id = %request_id,
                method = %ctx.method,
                path = %ctx.path,
                risk_level = %event.severity,
                reason = %detail,
                "Request blocked"
            ),
            AuditEventType::PipelineError => tracing::error!(
                event_id = %event.id,
                request_id = %request_id,
                method = %ctx.method,
                path = %ctx.path,
                location = %location,
                error = %detail,
                "Sanitization pipeline error"
            ),
        }
    }
}

/// Forwards events to a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Create a sink and the receiver that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn report_event(&self, event: AuditEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "full",
                mpsc::error::TrySendError::Closed(_) => "closed",
            };
            metrics::record_audit_dropped(reason);
            tracing::debug!(reason, "Audit event dropped");
        }
    }
}
