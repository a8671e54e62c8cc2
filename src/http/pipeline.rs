//! Request pipeline assembly.
//!
//! # Data Flow
//! ```text
//! request
//!     → StripPrefix (optional; 404 outside the prefix)
//!     → FetchDeadline (optional; child context bounded by fetch timeout)
//!     → engine handler
//! ```
//!
//! # Design Decisions
//! - The pipeline is an explicit, ordered list of stages; an unconfigured
//!   stage is absent from the list rather than a pass-through closure
//! - Each stage is a pure transform from service to service
//! - Prefix stripping always precedes the deadline so rejected requests
//!   never allocate a timer and the engine only ever sees stripped paths

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use crate::config::ServerConfig;
use crate::http::middleware::{fetch_deadline, strip_prefix};

/// Type-erased handler a pipeline stage wraps and returns.
pub type ProxyService = BoxCloneSyncService<Request, Response, Infallible>;

/// One middleware stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Reject paths outside the prefix, strip it from the rest.
    StripPrefix(Arc<str>),
    /// Bound each request by a fetch deadline.
    FetchDeadline(Duration),
}

impl Stage {
    /// Wrap `inner` with this stage.
    pub fn apply(&self, inner: ProxyService) -> ProxyService {
        match self {
            Stage::StripPrefix(prefix) => {
                ProxyService::new(from_fn_with_state(prefix.clone(), strip_prefix).layer(inner))
            }
            Stage::FetchDeadline(timeout) => {
                ProxyService::new(from_fn_with_state(*timeout, fetch_deadline).layer(inner))
            }
        }
    }
}

/// Ordered stages applied to every inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Stages for the given configuration, in their fixed order.
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut stages = Vec::with_capacity(2);
        if let Some(prefix) = config.path_prefix.as_deref().filter(|p| !p.is_empty()) {
            stages.push(Stage::StripPrefix(Arc::from(prefix)));
        }
        if !config.fetch_timeout.is_zero() {
            stages.push(Stage::FetchDeadline(config.fetch_timeout));
        }
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Compose the stages around `handler`; the first stage is outermost.
    pub fn wrap<S>(&self, handler: S) -> ProxyService
    where
        S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        self.stages
            .iter()
            .rev()
            .fold(ProxyService::new(handler), |service, stage| stage.apply(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_pipeline_is_empty() {
        let config = ServerConfig {
            fetch_timeout: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(Pipeline::from_config(&config).stages().is_empty());
    }

    #[test]
    fn test_prefix_precedes_deadline() {
        let config = ServerConfig {
            path_prefix: Some("/proxy".into()),
            fetch_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        assert_eq!(
            Pipeline::from_config(&config).stages(),
            &[
                Stage::StripPrefix(Arc::from("/proxy")),
                Stage::FetchDeadline(Duration::from_secs(5)),
            ]
        );
    }

    #[test]
    fn test_empty_prefix_is_absent() {
        let config = ServerConfig {
            path_prefix: Some(String::new()),
            ..ServerConfig::default()
        };
        assert_eq!(
            Pipeline::from_config(&config).stages(),
            &[Stage::FetchDeadline(Duration::from_secs(600))]
        );
    }
}
