//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use goproxy_server::config::ServerConfig;
use goproxy_server::lifecycle::Shutdown;
use goproxy_server::{Server, ServerState};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server bound to an ephemeral port and serving in the background.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<ServerState>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the terminal state.
    pub async fn stop(self) -> ServerState {
        self.shutdown.trigger();
        self.task.await.unwrap()
    }
}

/// Bind `config` on 127.0.0.1 with an ephemeral port and start serving.
pub async fn start_server(mut config: ServerConfig) -> RunningServer {
    config.address = "127.0.0.1:0".to_string();
    let listening = Server::new(config).unwrap().bind().await.unwrap();
    let addr = listening.local_addr();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(listening.run(shutdown.signalled()));
    RunningServer { addr, shutdown, task }
}

/// HTTP client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = relative.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Module cache with one version of `example.com/m`.
pub fn module_cache() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "example.com/m/@v/list", b"v1.0.0\n");
    write_file(
        dir.path(),
        "example.com/m/@v/v1.0.0.info",
        br#"{"Version":"v1.0.0","Time":"2024-01-01T00:00:00Z"}"#,
    );
    write_file(dir.path(), "example.com/m/@v/v1.0.0.mod", b"module example.com/m\n");
    dir
}

/// Server config that serves from `cache_dir`.
pub fn config_with_cache(cache_dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.engine.cache_dir = cache_dir.to_path_buf();
    config
}

/// Upstream that answers every request with a 1000-byte body, sends only
/// the first five bytes and then holds the connection open.
pub async fn stalled_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nhello")
                    .await;
                let _ = stream.flush().await;
                std::future::pending::<()>().await;
                drop(stream);
            });
        }
    });
    addr
}

/// Self-signed certificate and key for `localhost` and 127.0.0.1, written
/// as PEM files into a fresh directory.
pub fn self_signed_pair() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cert = dir.path().join("cert.pem");
    let key = dir.path().join("key.pem");
    std::fs::write(&cert, certified.cert.pem()).unwrap();
    std::fs::write(&key, certified.key_pair.serialize_pem()).unwrap();
    (dir, cert, key)
}
