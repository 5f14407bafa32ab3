//! input-shield library.
//!
//! Untrusted-input sanitization and injection detection for HTTP services,
//! packaged as an Axum middleware and a sanitizing reverse proxy.

// Core pipeline
pub mod detection;
pub mod policy;
pub mod sanitize;
pub mod surface;

// Service
pub mod config;
pub mod error;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::{SanitizerConfig, ServiceConfig};
pub use detection::{InjectionClass, InjectionDetectionResult, InjectionDetector, RiskLevel};
pub use error::PipelineError;
pub use http::{HttpServer, SanitizationPipeline};
pub use lifecycle::Shutdown;
pub use policy::Outcome;
