//! Outbound transport construction.
//!
//! # Responsibilities
//! - Derive the [`TransportPolicy`] from the server configuration
//! - Configure the `reqwest` client: connect timeout, TCP keep-alive,
//!   certificate verification
//! - Register extra protocol handlers (`file`) next to http/https
//!
//! # Design Decisions
//! - Starts from `reqwest`'s defaults so proxy environment variables and
//!   HTTP/2 keep working
//! - Built once per process; the resulting [`Transport`] is cloned, never
//!   rebuilt, so every request shares one connection pool

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::transport::file::FileProtocol;
use crate::transport::http::HttpProtocol;
use crate::transport::{ProtocolHandler, Transport};

/// TCP keep-alive interval for outgoing connections.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Certificate verification mode for outgoing TLS connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVerification {
    Verify,
    InsecureSkipVerify,
}

/// Connection-level settings shared by every outbound fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    /// Connection establishment limit; `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    pub keep_alive: Duration,
    pub tls: TlsVerification,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            keep_alive: DEFAULT_KEEP_ALIVE,
            tls: TlsVerification::Verify,
        }
    }
}

impl TransportPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            connect_timeout: Some(config.connect_timeout).filter(|t| !t.is_zero()),
            keep_alive: DEFAULT_KEEP_ALIVE,
            tls: if config.insecure {
                TlsVerification::InsecureSkipVerify
            } else {
                TlsVerification::Verify
            },
        }
    }
}

/// Builder for the process-wide [`Transport`].
pub struct TransportBuilder {
    policy: TransportPolicy,
    protocols: HashMap<String, Arc<dyn ProtocolHandler>>,
}

impl TransportBuilder {
    /// Builder with only http/https support.
    pub fn new(policy: TransportPolicy) -> Self {
        Self {
            policy,
            protocols: HashMap::new(),
        }
    }

    /// Builder for the server: policy from config, `file` registered.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(TransportPolicy::from_config(config))
            .register_protocol("file", FileProtocol::native())
    }

    /// Route URLs with `scheme` to `handler` instead of the network client.
    pub fn register_protocol(
        mut self,
        scheme: &str,
        handler: impl ProtocolHandler,
    ) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if self.protocols.contains_key(&scheme) {
            tracing::warn!(scheme = %scheme, "replacing registered protocol handler");
        }
        self.protocols.insert(scheme, Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Transport, TransportError> {
        let mut client = reqwest::Client::builder()
            .tcp_keepalive(self.policy.keep_alive)
            .danger_accept_invalid_certs(self.policy.tls == TlsVerification::InsecureSkipVerify);
        if let Some(timeout) = self.policy.connect_timeout {
            client = client.connect_timeout(timeout);
        }
        let client = client.build()?;

        tracing::debug!(
            connect_timeout = ?self.policy.connect_timeout,
            keep_alive = ?self.policy.keep_alive,
            tls = ?self.policy.tls,
            protocols = ?self.protocols.keys().collect::<Vec<_>>(),
            "Outbound transport built"
        );

        Ok(Transport::new(self.policy, HttpProtocol::new(client), self.protocols))
    }
}
