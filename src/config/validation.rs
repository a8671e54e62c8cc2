//! Configuration validation.
//!
//! # Responsibilities
//! - Detect inconsistent but tolerated settings (half a TLS pair)
//! - Flag prefixes that can never match a request path
//!
//! # Design Decisions
//! - Validation is a pure function: &ServerConfig → Vec<ConfigWarning>
//! - Nothing here is fatal; the server keeps its permissive startup and the
//!   operator gets a warning instead

use std::fmt;

use crate::config::schema::ServerConfig;

/// A tolerated configuration inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A certificate was given without a key; serving plain HTTP.
    TlsKeyMissing,
    /// A key was given without a certificate; serving plain HTTP.
    TlsCertMissing,
    /// Request paths always start with '/', so this prefix rejects everything.
    PrefixWithoutLeadingSlash(String),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::TlsKeyMissing => {
                write!(f, "TLS certificate file set without a key file, serving plain HTTP")
            }
            ConfigWarning::TlsCertMissing => {
                write!(f, "TLS key file set without a certificate file, serving plain HTTP")
            }
            ConfigWarning::PrefixWithoutLeadingSlash(prefix) => {
                write!(f, "path prefix {prefix:?} does not start with '/', every request will be rejected")
            }
        }
    }
}

/// Collect all warnings for the given configuration.
pub fn validate_config(config: &ServerConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    match (&config.tls_cert_file, &config.tls_key_file) {
        (Some(_), None) => warnings.push(ConfigWarning::TlsKeyMissing),
        (None, Some(_)) => warnings.push(ConfigWarning::TlsCertMissing),
        _ => {}
    }

    if let Some(prefix) = &config.path_prefix {
        if !prefix.starts_with('/') {
            warnings.push(ConfigWarning::PrefixWithoutLeadingSlash(prefix.clone()));
        }
    }

    warnings
}
