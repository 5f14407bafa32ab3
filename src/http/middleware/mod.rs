//! HTTP middleware.

pub mod interceptor;

pub use interceptor::{sanitize_request, SanitizationPipeline, Verdict};
