//! Sanitization policy.
//!
//! # Data Flow
//! ```text
//! SanitizerConfig
//!     → exclusion.rs (compiled path/method/content-type rules)
//!     → outcome.rs (detection results and pipeline errors → Outcome)
//! ```
//!
//! # Design Decisions
//! - Detection and sanitization never decide blocking; only this module does
//! - Each error kind has its own blocking flag

pub mod exclusion;
pub mod outcome;

pub use exclusion::{ExclusionRules, Matcher};
pub use outcome::{decide_detection, decide_error, BlockReason, Outcome};
