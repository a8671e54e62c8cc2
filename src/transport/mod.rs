//! Outbound transport subsystem.
//!
//! # Data Flow
//! ```text
//! engine fetch (Url, RequestContext)
//!     → Transport::get_with_context (races the request's cancellation)
//!     → scheme registry
//!         file        → file.rs (FileUrlResolver → local disk)
//!         http, https → http.rs (shared reqwest pool)
//!     → TransportResponse (status, headers, streaming body)
//! ```
//!
//! # Design Decisions
//! - One [`Transport`] per process, cloned cheaply into every consumer
//! - Local and network sources answer through the same response type so the
//!   engine never special-cases `file://`
//! - No retries at this layer

pub mod builder;
pub mod file;
pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use url::Url;

use crate::error::TransportError;
use crate::http::context::RequestContext;

pub use builder::{TlsVerification, TransportBuilder, TransportPolicy, DEFAULT_KEEP_ALIVE};
pub use file::{FileProtocol, FileUrlResolver, PathStyle};
pub use self::http::HttpProtocol;

/// Result of a single outbound fetch.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl TransportResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self { status, headers, body }
    }

    /// Buffer the whole body.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        axum::body::to_bytes(self.body, usize::MAX)
            .await
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))
    }

    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[header::HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

impl IntoResponse for TransportResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            if !HOP_BY_HOP.contains(name) && name.as_str() != "keep-alive" {
                headers.append(name.clone(), value.clone());
            }
        }
        response
    }
}

/// A fetch mechanism for one URL scheme.
pub trait ProtocolHandler: Send + Sync + 'static {
    fn round_trip(&self, url: Url) -> BoxFuture<'static, Result<TransportResponse, TransportError>>;
}

/// Shared outbound transport. Cloning shares the connection pool.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    policy: TransportPolicy,
    http: HttpProtocol,
    protocols: HashMap<String, Arc<dyn ProtocolHandler>>,
}

impl Transport {
    pub(crate) fn new(
        policy: TransportPolicy,
        http: HttpProtocol,
        protocols: HashMap<String, Arc<dyn ProtocolHandler>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner { policy, http, protocols }),
        }
    }

    pub fn policy(&self) -> &TransportPolicy {
        &self.inner.policy
    }

    /// Whether URLs with this scheme can be fetched.
    pub fn supports(&self, scheme: &str) -> bool {
        let scheme = scheme.to_ascii_lowercase();
        self.inner.protocols.contains_key(&scheme) || matches!(scheme.as_str(), "http" | "https")
    }

    /// Fetch `url` with a GET.
    pub async fn get(&self, url: Url) -> Result<TransportResponse, TransportError> {
        if let Some(handler) = self.inner.protocols.get(url.scheme()) {
            return handler.round_trip(url).await;
        }
        match url.scheme() {
            "http" | "https" => self.inner.http.round_trip(url).await,
            other => Err(TransportError::UnsupportedScheme(other.to_owned())),
        }
    }

    /// Fetch `url`, giving up as soon as the request context is cancelled.
    /// The returned body stays bound to `ctx` and fails once it is cancelled
    /// or its deadline passes.
    pub async fn get_with_context(
        &self,
        url: Url,
        ctx: &RequestContext,
    ) -> Result<TransportResponse, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(TransportError::Cancelled),
            result = self.get(url) => result?,
        };
        Ok(TransportResponse {
            body: ctx.bind_body(response.body, None),
            ..response
        })
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("policy", &self.inner.policy)
            .field("protocols", &self.inner.protocols.keys().collect::<Vec<_>>())
            .finish()
    }
}
