//! End-to-end tests against a bound server.

use std::time::Duration;

use goproxy_server::config::ServerConfig;
use goproxy_server::lifecycle::Shutdown;
use goproxy_server::{Server, ServerState};
use reqwest::StatusCode;
use url::Url;

mod common;

#[tokio::test]
async fn test_serves_cached_module_files() {
    let cache = common::module_cache();
    let server = common::start_server(common::config_with_cache(cache.path())).await;
    let client = common::client();

    let list = client.get(server.url("/example.com/m/@v/list")).send().await.unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(list.headers()["content-type"], "text/plain; charset=utf-8");
    assert!(list.headers().contains_key("x-request-id"));
    assert_eq!(list.text().await.unwrap(), "v1.0.0\n");

    let info = client.get(server.url("/example.com/m/@v/v1.0.0.info")).send().await.unwrap();
    assert_eq!(info.headers()["content-type"], "application/json; charset=utf-8");

    let miss = client.get(server.url("/example.com/m/@v/v9.9.9.zip")).send().await.unwrap();
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);
    assert_eq!(miss.text().await.unwrap(), "not found");

    assert_eq!(server.stop().await, ServerState::ShutdownClean);
}

#[tokio::test]
async fn test_head_and_method_check() {
    let cache = common::module_cache();
    let server = common::start_server(common::config_with_cache(cache.path())).await;
    let client = common::client();

    let head = client.head(server.url("/example.com/m/@v/v1.0.0.mod")).send().await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(head.headers()["content-length"], "21");

    let post = client.post(server.url("/example.com/m/@v/list")).send().await.unwrap();
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);

    server.stop().await;
}

#[tokio::test]
async fn test_prefix_over_the_network() {
    let cache = common::module_cache();
    let mut config = common::config_with_cache(cache.path());
    config.path_prefix = Some("/goproxy".to_string());
    let server = common::start_server(config).await;
    let client = common::client();

    let inside = client.get(server.url("/goproxy/example.com/m/@v/list")).send().await.unwrap();
    assert_eq!(inside.status(), StatusCode::OK);
    assert_eq!(inside.text().await.unwrap(), "v1.0.0\n");

    let outside = client.get(server.url("/example.com/m/@v/list")).send().await.unwrap();
    assert_eq!(outside.status(), StatusCode::NOT_FOUND);
    assert_eq!(outside.text().await.unwrap(), "404 page not found");

    server.stop().await;
}

#[tokio::test]
async fn test_proxied_sumdb_from_file_base() {
    let cache = common::module_cache();
    let upstream = tempfile::tempdir().unwrap();
    common::write_file(upstream.path(), "latest", b"go.sum database tree\n42\n");
    common::write_file(upstream.path(), "lookup/example.com/m@v1.0.0", b"42\nexample.com/m v1.0.0 h1:abc=\n");

    let base = Url::from_directory_path(upstream.path()).unwrap();
    let mut config = common::config_with_cache(cache.path());
    config.engine.proxied_sumdbs = vec![format!("sum.example.org {base}")];
    let server = common::start_server(config).await;
    let client = common::client();

    let supported = client.get(server.url("/sumdb/sum.example.org/supported")).send().await.unwrap();
    assert_eq!(supported.status(), StatusCode::OK);

    let latest = client.get(server.url("/sumdb/sum.example.org/latest")).send().await.unwrap();
    assert_eq!(latest.status(), StatusCode::OK);
    assert_eq!(latest.text().await.unwrap(), "go.sum database tree\n42\n");

    let lookup = client
        .get(server.url("/sumdb/sum.example.org/lookup/example.com/m@v1.0.0"))
        .send()
        .await
        .unwrap();
    assert_eq!(lookup.status(), StatusCode::OK);

    let missing = client.get(server.url("/sumdb/sum.example.org/tile/8/0/000")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let unknown = client.get(server.url("/sumdb/sum.golang.org/supported")).send().await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_fetch_timeout_cuts_stalled_upstream_body() {
    let upstream = common::stalled_upstream().await;
    let cache = common::module_cache();
    let mut config = common::config_with_cache(cache.path());
    config.fetch_timeout = Duration::from_millis(500);
    config.engine.proxied_sumdbs = vec![format!("sum.example.org http://{upstream}/")];
    let server = common::start_server(config).await;

    let start = tokio::time::Instant::now();
    let response = common::client()
        .get(server.url("/sumdb/sum.example.org/latest"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = tokio::time::timeout(Duration::from_secs(5), response.bytes())
        .await
        .expect("body outlived the fetch timeout");
    assert!(body.is_err());
    assert!(start.elapsed() >= Duration::from_millis(500));

    server.stop().await;
}

#[tokio::test]
async fn test_serves_over_tls() {
    let cache = common::module_cache();
    let (_certs, cert, key) = common::self_signed_pair();
    let mut config = common::config_with_cache(cache.path());
    config.address = "127.0.0.1:0".to_string();
    config.tls_cert_file = Some(cert);
    config.tls_key_file = Some(key);

    let listening = Server::new(config).unwrap().bind().await.unwrap();
    assert!(listening.is_tls());
    let addr = listening.local_addr();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(listening.run(shutdown.signalled()));

    let client = reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    let response = client
        .get(format!("https://localhost:{}/example.com/m/@v/list", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "v1.0.0\n");
    drop(client);

    shutdown.trigger();
    let state = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert_eq!(state, ServerState::ShutdownClean);
}

#[tokio::test]
async fn test_cert_without_key_serves_plain_http() {
    let cache = common::module_cache();
    let mut config = common::config_with_cache(cache.path());
    config.tls_cert_file = Some(cache.path().join("does-not-matter.pem"));
    let server = common::start_server(config).await;

    let response = common::client()
        .get(server.url("/example.com/m/@v/list"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(server.stop().await, ServerState::ShutdownClean);
}

#[tokio::test]
async fn test_shutdown_before_any_request_is_clean() {
    let server = common::start_server(ServerConfig::default()).await;
    let state = tokio::time::timeout(Duration::from_secs(5), server.stop()).await.unwrap();
    assert_eq!(state, ServerState::ShutdownClean);
}

#[tokio::test]
async fn test_address_in_use_is_shutdown_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let config = ServerConfig {
        address: taken.local_addr().unwrap().to_string(),
        ..ServerConfig::default()
    };

    let state = Server::new(config).unwrap().run(std::future::pending::<()>()).await;
    assert_eq!(state, ServerState::ShutdownError);
}
