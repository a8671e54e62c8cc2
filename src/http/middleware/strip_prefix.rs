//! Path prefix stripping.
//!
//! Requests outside the prefix are answered 404 here and never reach the
//! engine. Matching requests lose exactly one leading copy of the prefix,
//! which may arrive percent-encoded.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::{StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tracing::debug;

pub async fn strip_prefix(
    State(prefix): State<Arc<str>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(uri) = strip_uri_prefix(request.uri(), &prefix) else {
        debug!(
            path = %request.uri().path(),
            prefix = %prefix,
            "Request path outside configured prefix"
        );
        return (StatusCode::NOT_FOUND, "404 page not found").into_response();
    };
    *request.uri_mut() = uri;
    next.run(request).await
}

/// `uri` with one leading `prefix` removed from its path, query preserved.
///
/// Returns `None` when the path does not start with `prefix`, literally or
/// once decoded. A remainder without a leading `/` (prefix ending in `/`) is
/// re-rooted.
pub fn strip_uri_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let path = uri.path();
    let rest = match path.strip_prefix(prefix) {
        Some(rest) => rest,
        None => &path[encoded_prefix_len(path, prefix)?..],
    };

    let mut path_and_query = String::with_capacity(rest.len() + 1);
    if !rest.starts_with('/') {
        path_and_query.push('/');
    }
    path_and_query.push_str(rest);
    if let Some(query) = uri.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Length of the raw leading part of `path` that decodes to `prefix`.
/// An encoded `/` never stands in for a separator.
fn encoded_prefix_len(path: &str, prefix: &str) -> Option<usize> {
    let longest = path.len().min(prefix.len().saturating_mul(3));
    (prefix.len()..=longest).find(|&end| {
        path.get(..end).is_some_and(|raw| {
            !raw.contains("%2F")
                && !raw.contains("%2f")
                && percent_decode_str(raw).eq(prefix.bytes())
        })
    })
}
