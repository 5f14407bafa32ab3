//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID)
//!     → middleware/interceptor.rs (inspect, sanitize, block or continue)
//!     → server.rs proxy_handler (forward to upstream)
//!     → response.rs (400 block bodies, 502 upstream failures)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{SanitizationPipeline, Verdict};
pub use request::X_REQUEST_ID;
pub use response::{ErrorDetails, ErrorResponse};
pub use server::HttpServer;
