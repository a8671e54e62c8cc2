//! Per-request cancellation context.
//!
//! # Responsibilities
//! - Carry a cancellation token and an optional deadline with each request
//! - Derive child contexts that tighten the deadline without losing the
//!   parent's cancellation
//! - Release (cancel) the context when the request scope ends, which is
//!   when the response body has been sent, not when the headers are ready
//! - Cut off response bodies still streaming when the context is cancelled
//!   or its deadline passes
//!
//! # Design Decisions
//! - The context lives in request extensions; handlers read it with
//!   [`RequestContextExt::context`]
//! - A dropped request future or response body (client gone) drops its
//!   guard, which cancels the context and every child derived from it
//! - Deadlines use `tokio::time::Instant` so paused-clock tests are exact

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Frame, SizeHint};
use pin_project_lite::pin_project;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::{
    CancellationToken, DropGuard, WaitForCancellationFuture, WaitForCancellationFutureOwned,
};

use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A fresh context with no deadline.
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Child context bounded by `timeout` from now (or the parent's
    /// deadline, whichever is earlier). Cancelling `self` cancels the child.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, candidate) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves when the deadline passes; never resolves without one.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Guard that cancels this context when dropped.
    pub fn release_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// `body` bound to this context. It fails with a cancellation error once
    /// the context is cancelled or its deadline passes. `release`, if given,
    /// is held until the body ends or is dropped.
    pub fn bind_body(&self, body: Body, release: Option<DropGuard>) -> Body {
        Body::new(ContextBody {
            inner: body,
            cancelled: self.token.clone().cancelled_owned(),
            expiry: self.deadline.map(tokio::time::sleep_until),
            ctx: self.clone(),
            release,
            finished: false,
        })
    }

    /// `response` with its body bound to this context, holding `release`
    /// until the body has been sent.
    pub fn scope_response(&self, response: Response, release: DropGuard) -> Response {
        response.map(|body| self.bind_body(body, Some(release)))
    }
}

pin_project! {
    struct ContextBody {
        #[pin]
        inner: Body,
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        #[pin]
        expiry: Option<Sleep>,
        ctx: RequestContext,
        release: Option<DropGuard>,
        finished: bool,
    }
}

impl http_body::Body for ContextBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        let expired = this
            .expiry
            .as_pin_mut()
            .is_some_and(|sleep| sleep.poll(cx).is_ready());
        if expired || this.cancelled.poll(cx).is_ready() {
            *this.finished = true;
            this.ctx.cancel();
            this.release.take();
            return Poll::Ready(Some(Err(axum::Error::new(TransportError::Cancelled))));
        }

        let frame = http_body::Body::poll_frame(this.inner, cx);
        if matches!(frame, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            *this.finished = true;
            this.release.take();
        }
        frame
    }

    fn is_end_stream(&self) -> bool {
        self.finished || http_body::Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        http_body::Body::size_hint(&self.inner)
    }
}

/// Access to the [`RequestContext`] stored in request extensions.
pub trait RequestContextExt {
    fn context(&self) -> Option<&RequestContext>;
}

impl<B> RequestContextExt for axum::http::Request<B> {
    fn context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

/// Outermost middleware: every request gets a root context that is
/// cancelled once its response body is sent or when the request is dropped.
pub async fn attach_context(mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::root();
    let release = ctx.release_on_drop();
    request.extensions_mut().insert(ctx.clone());
    let response = next.run(request).await;
    ctx.scope_response(response, release)
}
