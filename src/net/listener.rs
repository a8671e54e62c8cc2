//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve and bind the configured address (host names allowed)
//! - Report bind failures with the address that failed

use tokio::net::TcpListener;

use crate::error::ServeError;

/// Bind to `address` ("host:port").
pub async fn bind(address: &str) -> Result<TcpListener, ServeError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServeError::Bind {
            address: address.to_string(),
            source,
        })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let first = bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().unwrap().to_string();

        match bind(&taken).await {
            Err(ServeError::Bind { address, .. }) => assert_eq!(address, taken),
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
