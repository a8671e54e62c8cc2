//! TLS configuration and certificate loading.

use std::io;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsFiles;

/// Load the rustls server configuration from a PEM certificate/key pair.
pub async fn load_tls_config(files: TlsFiles<'_>) -> io::Result<RustlsConfig> {
    for (path, what) in [(files.cert, "certificate"), (files.key, "private key")] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {what} file not found: {}", path.display()),
            ));
        }
    }

    RustlsConfig::from_pem_file(files.cert, files.key).await
}
