//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (request ID, trace span, request context)
//!     → pipeline.rs
//!         → middleware/strip_prefix.rs (404 outside the prefix)
//!         → middleware/deadline.rs (fetch deadline on the context)
//!     → engine handler
//!     → Send to client
//! ```

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod server;

pub use context::{RequestContext, RequestContextExt};
pub use pipeline::{Pipeline, ProxyService, Stage};
pub use server::{ListeningServer, Server, ServerState};
