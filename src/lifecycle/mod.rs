//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - Startup order lives in `main`: config, logging, metrics, listener
//! - Shutdown is cooperative; the server finishes requests it already accepted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
