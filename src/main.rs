//! goproxy-server
//!
//! An HTTP front-end for a Go module proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net (listener, TLS)
//!                       → http::server (request ID, trace, request context)
//!                       → http::pipeline (strip prefix → fetch deadline)
//!                       → engine (cache, checksum database proxy)
//!                       → transport (file:// via FileUrlResolver, http(s) via reqwest)
//!     ◀──────────────── response
//! ```

use std::process::ExitCode;

use clap::Parser;

use goproxy_server::config::Cli;
use goproxy_server::lifecycle::{spawn_signal_listener, Shutdown};
use goproxy_server::observability::logging::init_logging;
use goproxy_server::{Server, ServerState};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "goproxy-server starting");

    let config = cli.into_config();
    tracing::info!(
        address = %config.address,
        connect_timeout = ?config.connect_timeout,
        fetch_timeout = ?config.fetch_timeout,
        insecure = config.insecure,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "http server error");
            return ExitCode::FAILURE;
        }
    };

    match server.run(shutdown.signalled()).await {
        ServerState::ShutdownClean => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        _ => ExitCode::FAILURE,
    }
}
