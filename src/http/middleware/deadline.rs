//! Per-request fetch deadline.
//!
//! The downstream handler runs under a child of the request's context. The
//! child is cancelled when the deadline passes or the client goes away, and
//! released once the response body has been sent. A body still streaming at
//! the deadline is cut off. No status is synthesized on expiry: the handler's
//! own response (usually an error it produced after noticing cancellation)
//! is what the client receives.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::http::context::{RequestContext, RequestContextExt};

pub async fn fetch_deadline(
    State(timeout): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = match request.context() {
        Some(parent) => parent.with_timeout(timeout),
        None => RequestContext::root().with_timeout(timeout),
    };
    let release = ctx.release_on_drop();
    request.extensions_mut().insert(ctx.clone());

    let path = request.uri().path().to_owned();
    let downstream = next.run(request);
    tokio::pin!(downstream);

    tokio::select! {
        response = &mut downstream => return ctx.scope_response(response, release),
        _ = ctx.expired() => {}
    }

    debug!(
        path = %path,
        timeout_ms = timeout.as_millis() as u64,
        "Fetch deadline exceeded, cancelling request context"
    );
    ctx.cancel();
    let response = downstream.await;
    drop(release);
    response
}
