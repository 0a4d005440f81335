//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header::HOST, HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use rr_balancer::{BackendRegistry, HttpServer, ProxyConfig, Shutdown};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a raw TCP backend that answers every connection with 200 and `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start an axum backend answering every path with `status` and `body`.
pub async fn start_fixed_backend(status: StatusCode, body: &'static str) -> SocketAddr {
    start_backend(Router::new().fallback(move || async move { (status, body) })).await
}

/// Start a backend that echoes what it received as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Router::new().fallback(echo)).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "host": headers.get(HOST).and_then(|v| v.to_str().ok()),
        "x_custom": header("x-custom"),
        "x_forwarded_for": header("x-forwarded-for"),
        "x_request_id": header("x-request-id"),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Serve `app` on an ephemeral port.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running balancer under test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub registry: Arc<BackendRegistry>,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let server = HttpServer::new(config).expect("seed backends must be valid");
        let registry = server.registry().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let signal = shutdown.wait();
        tokio::spawn(async move {
            let _ = server.run(listener, signal).await;
        });

        Self {
            addr,
            registry,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
