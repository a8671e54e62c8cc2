//! Configuration schema definitions.
//!
//! Every value here is built once at startup and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address the HTTP server listens on (e.g., "localhost:8080").
    pub address: String,

    /// Path to the TLS certificate file (PEM).
    pub tls_cert_file: Option<PathBuf>,

    /// Path to the TLS private key file (PEM).
    pub tls_key_file: Option<PathBuf>,

    /// Prefix every externally visible request path starts with.
    pub path_prefix: Option<String>,

    /// Outgoing connection establishment limit. Zero means no limit.
    pub connect_timeout: Duration,

    /// Per-request fetch deadline. Zero means no deadline.
    pub fetch_timeout: Duration,

    /// Skip TLS certificate verification on outgoing connections.
    pub insecure: bool,

    /// Parameters handed through to the module proxy engine.
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            tls_cert_file: None,
            tls_key_file: None,
            path_prefix: None,
            connect_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10 * 60),
            insecure: false,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Certificate and key paths, only when both are configured.
    pub fn tls(&self) -> Option<TlsFiles<'_>> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some(TlsFiles { cert, key }),
            _ => None,
        }
    }
}

/// A complete certificate/key pair.
#[derive(Debug, Clone, Copy)]
pub struct TlsFiles<'a> {
    pub cert: &'a PathBuf,
    pub key: &'a PathBuf,
}

/// Module proxy engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the Go binary used to execute direct fetches.
    pub go_bin_name: String,

    /// Maximum concurrent direct fetches (0 means no limit).
    pub max_direct_fetches: usize,

    /// Proxied checksum databases, each "name" or "name url".
    pub proxied_sumdbs: Vec<String>,

    /// Directory module files are cached in.
    pub cache_dir: PathBuf,

    /// Directory for temporary files.
    pub temp_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            go_bin_name: "go".to_string(),
            max_direct_fetches: 0,
            proxied_sumdbs: Vec::new(),
            cache_dir: PathBuf::from("caches"),
            temp_dir: std::env::temp_dir(),
        }
    }
}
