//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define shield metrics (requests, latency, detections, blocks, errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `shield_requests_total` (counter): requests by method, status, outcome
//! - `shield_request_duration_seconds` (histogram): end-to-end latency
//! - `shield_detections_total` (counter): detections by class, risk, location
//! - `shield_blocked_total` (counter): rejected requests by reason
//! - `shield_pipeline_errors_total` (counter): pipeline errors by kind
//! - `shield_audit_events_total` / `shield_audit_dropped_total` (counters)
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without an installed recorder every call is a no-op, so tests and the
//!   offline CLI need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("shield_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "shield_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("shield_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_detection(class: &'static str, risk: &'static str, location: &'static str) {
    metrics::counter!(
        "shield_detections_total",
        "class" => class,
        "risk" => risk,
        "location" => location
    )
    .increment(1);
}

pub fn record_blocked(reason: &'static str) {
    metrics::counter!("shield_blocked_total", "reason" => reason).increment(1);
}

pub fn record_pipeline_error(kind: &'static str) {
    metrics::counter!("shield_pipeline_errors_total", "kind" => kind).increment(1);
}

pub fn record_audit_event(event_type: &'static str) {
    metrics::counter!("shield_audit_events_total", "type" => event_type).increment(1);
}

pub fn record_audit_dropped(reason: &'static str) {
    metrics::counter!("shield_audit_dropped_total", "reason" => reason).increment(1);
}
