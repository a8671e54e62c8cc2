//! HTTP server assembly.
//!
//! # Responsibilities
//! - Build the outbound transport once and inject it into the engine
//! - Wrap the engine with the request pipeline and the per-request layers
//!   (request ID, trace span, request context)
//! - Bind the listener, plain or TLS
//! - Serve until shutdown and report how serving ended
//!
//! # Design Decisions
//! - TLS only when both certificate and key are configured; a partial pair
//!   serves plain HTTP and is reported as a configuration warning
//! - `Server` → `ListeningServer` mirrors `Init` → `Listening`: the
//!   transition happens once, before the serve loop blocks
//! - An intentional shutdown ends in `ShutdownClean`; any other serve error
//!   is logged once and ends in `ShutdownError`, with no restart

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use axum::extract::Request;
use axum::middleware::from_fn;
use axum::response::Response;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::net::TcpListener;
use tower::Service;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{validate_config, ServerConfig};
use crate::engine::{DirCacher, Goproxy};
use crate::error::ServeError;
use crate::http::context::attach_context;
use crate::http::pipeline::Pipeline;
use crate::net::{listener, tls};
use crate::transport::TransportBuilder;

/// Where a server is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    Listening,
    ShutdownClean,
    ShutdownError,
}

/// An assembled, not yet bound server.
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    /// Assemble the server around the reference engine.
    pub fn new(config: ServerConfig) -> Result<Self, ServeError> {
        let transport = TransportBuilder::from_config(&config).build()?;
        let engine = Goproxy::new(
            config.engine.clone(),
            DirCacher::new(&config.engine.cache_dir),
            transport,
        );

        tracing::info!(
            go_bin_name = %config.engine.go_bin_name,
            max_direct_fetches = config.engine.max_direct_fetches,
            proxied_sumdbs = engine.sumdbs().len(),
            cache_dir = %config.engine.cache_dir.display(),
            temp_dir = %config.engine.temp_dir.display(),
            "Engine configured"
        );

        Ok(Self::with_engine(config, engine.into_router()))
    }

    /// Assemble the server around any engine handler.
    pub fn with_engine<S>(config: ServerConfig, engine: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        let pipeline = Pipeline::from_config(&config);
        tracing::debug!(stages = ?pipeline.stages(), "Request pipeline assembled");

        let app = Router::new()
            .fallback_service(pipeline.wrap(engine))
            .layer(from_fn(attach_context))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self { config, app }
    }

    pub fn state(&self) -> ServerState {
        ServerState::Init
    }

    /// The fully layered router, for serving in-process.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Load TLS material if configured and bind the listener.
    pub async fn bind(self) -> Result<ListeningServer, ServeError> {
        for warning in validate_config(&self.config) {
            tracing::warn!(%warning, "Configuration warning");
        }

        let tls = match self.config.tls() {
            Some(files) => Some(tls::load_tls_config(files).await.map_err(ServeError::Tls)?),
            None => None,
        };

        let listener = listener::bind(&self.config.address).await?;
        let local_addr = listener.local_addr().map_err(ServeError::Serve)?;

        tracing::info!(
            address = %local_addr,
            tls = tls.is_some(),
            path_prefix = self.config.path_prefix.as_deref().unwrap_or(""),
            fetch_timeout = ?self.config.fetch_timeout,
            "HTTP server listening"
        );

        Ok(ListeningServer {
            listener,
            local_addr,
            tls,
            app: self.app,
        })
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> ServerState
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.bind().await {
            Ok(server) => server.run(shutdown).await,
            Err(e) => {
                tracing::error!(error = %e, "http server error");
                ServerState::ShutdownError
            }
        }
    }
}

/// A bound server, ready to accept connections.
pub struct ListeningServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    tls: Option<RustlsConfig>,
    app: Router,
}

impl ListeningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn state(&self) -> ServerState {
        ServerState::Listening
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(tls) = self.tls else {
            return axum::serve(self.listener, self.app)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(ServeError::Serve);
        };

        let handle = Handle::new();
        let watcher = tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown.await;
                handle.graceful_shutdown(None);
            }
        });

        let listener = self.listener.into_std().map_err(ServeError::Serve)?;
        let result = axum_server::from_tcp_rustls(listener, tls)
            .handle(handle)
            .serve(self.app.into_make_service())
            .await;

        watcher.abort();
        result.map_err(ServeError::Serve)
    }

    /// Serve and translate the outcome into a terminal state.
    pub async fn run<F>(self, shutdown: F) -> ServerState
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.serve(shutdown).await {
            Ok(()) => {
                tracing::info!("HTTP server stopped");
                ServerState::ShutdownClean
            }
            Err(e) => {
                tracing::error!(error = %e, "http server error");
                ServerState::ShutdownError
            }
        }
    }
}
