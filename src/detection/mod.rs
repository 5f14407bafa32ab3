//! Injection detection subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     built-in signatures + config custom_patterns
//!     → catalog.rs (compile, skip invalid)
//!     → Arc<PatternCatalog> (immutable)
//!
//! Per value:
//!     &str → detector.rs (run every matcher, in catalog order)
//!     → InjectionDetectionResult (class, risk, confidence, diagnostics)
//! ```
//!
//! # Design Decisions
//! - Detection is independent of the block/continue decision (see `policy`)
//! - No state carried between calls

pub mod catalog;
pub mod detector;
pub mod types;

pub use catalog::{CatalogEntry, PatternCatalog, PatternError, PatternMatcher, RegexMatcher};
pub use detector::InjectionDetector;
pub use types::{InjectionClass, InjectionDetectionResult, RiskLevel};
