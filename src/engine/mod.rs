//! Module proxy engine.
//!
//! A thin reference engine behind the request pipeline. It serves cached
//! module files and proxies the configured checksum databases through the
//! shared [`Transport`]. Resolving modules from version control is out of
//! scope; anything not cached is a 404.
//!
//! # Data Flow
//! ```text
//! request (prefix already stripped, context attached)
//!     → method check (GET/HEAD)
//!     → /sumdb/<name>/supported   → 200 if proxied
//!     → /sumdb/<name>/<rest>      → FetchLimiter → Transport::get_with_context
//!     → everything else           → Cacher
//! ```

pub mod cacher;
pub mod limiter;
pub mod sumdb;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use percent_encoding::percent_decode_str;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::config::EngineConfig;
use crate::error::TransportError;
use crate::http::context::{RequestContext, RequestContextExt};
use crate::transport::Transport;

pub use cacher::{CachedFile, Cacher, DirCacher};
pub use limiter::FetchLimiter;
pub use sumdb::SumdbTable;

/// The engine handler. Cloning shares all state.
#[derive(Clone)]
pub struct Goproxy {
    inner: Arc<Inner>,
}

struct Inner {
    config: EngineConfig,
    cacher: Box<dyn Cacher>,
    transport: Transport,
    sumdbs: SumdbTable,
    limiter: FetchLimiter,
}

impl Goproxy {
    pub fn new(config: EngineConfig, cacher: impl Cacher, transport: Transport) -> Self {
        let sumdbs = SumdbTable::parse(&config.proxied_sumdbs);
        let limiter = FetchLimiter::new(config.max_direct_fetches);
        Self {
            inner: Arc::new(Inner {
                config,
                cacher: Box::new(cacher),
                transport,
                sumdbs,
                limiter,
            }),
        }
    }

    pub fn sumdbs(&self) -> &SumdbTable {
        &self.inner.sumdbs
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .route("/sumdb/{name}/{*rest}", any(serve_sumdb))
            .fallback(serve_cached)
            .with_state(self)
    }

    /// Fetch `url` under the fetch limiter and the request context.
    async fn fetch(&self, url: Url, ctx: &RequestContext) -> Response {
        let _permit = tokio::select! {
            biased;
            _ = ctx.cancelled() => return TransportError::Cancelled.into_response(),
            permit = self.inner.limiter.acquire() => permit,
        };

        match self.inner.transport.get_with_context(url.clone(), ctx).await {
            Ok(response) => {
                if !response.status.is_success() {
                    tracing::debug!(url = %url, status = %response.status, "Upstream answered with an error status");
                }
                response.into_response()
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Fetch failed");
                e.into_response()
            }
        }
    }
}

impl std::fmt::Debug for Goproxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Goproxy")
            .field("config", &self.inner.config)
            .field("sumdbs", &self.inner.sumdbs)
            .field("limiter", &self.inner.limiter)
            .finish_non_exhaustive()
    }
}

async fn serve_sumdb(
    State(engine): State<Goproxy>,
    Path((name, rest)): Path<(String, String)>,
    request: Request,
) -> Response {
    if !is_read_method(request.method()) {
        return method_not_allowed();
    }
    if !engine.inner.sumdbs.contains(&name) || !is_clean_name(&rest) {
        return not_found();
    }
    if rest == "supported" {
        return StatusCode::OK.into_response();
    }
    let Some(url) = engine.inner.sumdbs.upstream_url(&name, &rest) else {
        return not_found();
    };

    let ctx = request.context().cloned().unwrap_or_else(RequestContext::root);
    engine.fetch(url, &ctx).await
}

async fn serve_cached(State(engine): State<Goproxy>, request: Request) -> Response {
    if !is_read_method(request.method()) {
        return method_not_allowed();
    }
    let Ok(path) = percent_decode_str(request.uri().path()).decode_utf8() else {
        return not_found();
    };
    let name = path.trim_start_matches('/');
    if !is_clean_name(name) {
        return not_found();
    }

    match engine.inner.cacher.get(name).await {
        Ok(Some(cached)) => {
            let mut response = Body::from_stream(ReaderStream::new(cached.file)).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(module_content_type(name)));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(cached.size));
            response
        }
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(name = %name, error = %e, "Cache read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

fn is_read_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, HEAD")],
        "method not allowed",
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CACHE_CONTROL, "public, max-age=60")],
        "not found",
    )
        .into_response()
}

/// Whether `name` is a relative slash path without empty, `.` or `..`
/// segments.
pub fn is_clean_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['\\', '\0'])
        && name.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

fn module_content_type(name: &str) -> &'static str {
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.ends_with(".info") || base == "@latest" {
        "application/json; charset=utf-8"
    } else if base.ends_with(".zip") {
        "application/zip"
    } else if base.ends_with(".mod") || base == "list" {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
