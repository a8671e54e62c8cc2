//! Error types shared across the server.
//!
//! # Design Decisions
//! - Path validation failures are distinct from filesystem failures so that
//!   callers can tell a rejected URL from a missing file
//! - Transport errors carry their own HTTP status mapping; the engine turns
//!   them into responses, nothing in this crate retries them
//! - Serve errors are terminal and only ever logged once by the binary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A `file://` URL path that cannot be mapped onto the local filesystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPathError {
    #[error("file URL missing drive letter")]
    MissingDriveLetter,

    #[error("path is not absolute")]
    NotAbsolute,

    #[error("file URL path is not valid UTF-8 after decoding")]
    InvalidEncoding,
}

/// Failure to resolve and open a local file URL.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single outbound fetch.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid file URL: {0}")]
    InvalidPath(#[from] InvalidPathError),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unsupported protocol scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl From<ResolveError> for TransportError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidPath(e) => TransportError::InvalidPath(e),
            ResolveError::Io(e) => TransportError::Io(e),
        }
    }
}

impl TransportError {
    /// HTTP status a proxy handler should answer with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TransportError::InvalidPath(_) | TransportError::UnsupportedScheme(_) => {
                StatusCode::BAD_REQUEST
            }
            TransportError::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            TransportError::Request(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            TransportError::Request(_) => StatusCode::BAD_GATEWAY,
            TransportError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Terminal server failure.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS certificate/key: {0}")]
    Tls(#[source] std::io::Error),

    #[error("failed to build outbound transport: {0}")]
    Transport(#[from] TransportError),

    #[error("http server error: {0}")]
    Serve(#[source] std::io::Error),
}
