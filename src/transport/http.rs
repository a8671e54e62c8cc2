//! Network fetches over http and https.

use axum::body::Body;
use futures_util::future::BoxFuture;
use url::Url;

use crate::error::TransportError;
use crate::transport::{ProtocolHandler, TransportResponse};

/// Protocol handler backed by the shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct HttpProtocol {
    client: reqwest::Client,
}

impl HttpProtocol {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ProtocolHandler for HttpProtocol {
    fn round_trip(&self, url: Url) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        let client = self.client.clone();
        Box::pin(async move {
            tracing::debug!(url = %url, "outbound fetch");
            let response = client.get(url).send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            Ok(TransportResponse::new(
                status,
                headers,
                Body::from_stream(response.bytes_stream()),
            ))
        })
    }
}
