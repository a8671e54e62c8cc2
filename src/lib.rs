//! Go module proxy server library.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod transport;

pub use config::ServerConfig;
pub use error::{InvalidPathError, ServeError, TransportError};
pub use http::{Server, ServerState};
pub use lifecycle::Shutdown;
pub use transport::{Transport, TransportBuilder};
