//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use switchyard::{handler_fn, Response, Server, ServerConfig};

/// Config bound to an ephemeral loopback port with background checks off.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.health_check.enabled = false;
    config
}

/// Start `server` and return its address.
pub async fn start(server: &Server) -> SocketAddr {
    server.listen_and_serve().await.unwrap()
}

/// A server with the admin routes plus `/echo/{name}` and `/fail`.
pub async fn start_echo_server(config: ServerConfig) -> (Server, SocketAddr) {
    let server = Server::new(config);
    server.serve_admin().unwrap();
    server
        .add_route(
            "/echo/{name}",
            handler_fn(|req| {
                let name = req.variable("name").unwrap_or_default();
                let body = if req.body().is_empty() {
                    name.to_string()
                } else {
                    format!("{name}:{}", String::from_utf8_lossy(req.body()))
                };
                Ok(Response::ok_text(body))
            }),
        )
        .unwrap();
    server
        .add_route(
            "/fail",
            handler_fn(|_| Err(std::io::Error::other("handler blew up"))),
        )
        .unwrap();

    let address = start(&server).await;
    (server, address)
}

/// An HTTP/1.1-only client that never reuses connections.
pub fn http1_client() -> reqwest::Client {
    reqwest::Client::builder()
        .http1_only()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// An HTTP/2 prior-knowledge client over cleartext.
pub fn http2_client() -> reqwest::Client {
    reqwest::Client::builder()
        .http2_prior_knowledge()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
