//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sanitization pipeline produces:
//!     → audit.rs (detections, blocks, pipeline errors → AuditSink)
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Custom audit consumers (ChannelAuditSink receiver)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every audit event
//! - Metrics are cheap (atomic increments)

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{AuditContext, AuditEvent, AuditEventType, AuditSink, ChannelAuditSink, TracingAuditSink};
