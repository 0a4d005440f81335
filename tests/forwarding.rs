//! End-to-end forwarding through a running balancer.

use std::time::Duration;

use axum::{
    http::{header::SET_COOKIE, StatusCode},
    Router,
};
use rr_balancer::ProxyConfig;
use serde_json::Value;

mod common;

use common::TestProxy;

#[tokio::test]
async fn test_forward_relays_status_and_body() {
    let backend = common::start_mock_backend("ok").await;

    let mut config = ProxyConfig::default();
    config.backends.push(backend.to_string());
    let proxy = TestProxy::start(config).await;

    let res = common::client()
        .get(proxy.url("/api/anything"))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_round_robin_across_backends() {
    let b0 = common::start_fixed_backend(StatusCode::OK, "b0").await;
    let b1 = common::start_fixed_backend(StatusCode::OK, "b1").await;
    let b2 = common::start_fixed_backend(StatusCode::OK, "b2").await;

    let mut config = ProxyConfig::default();
    config.backends = vec![b0.to_string(), b1.to_string(), b2.to_string()];
    let proxy = TestProxy::start(config).await;

    let client = common::client();
    let mut bodies = Vec::new();
    for _ in 0..6 {
        let res = client.get(proxy.url("/api/")).send().await.unwrap();
        bodies.push(res.text().await.unwrap());
    }

    assert_eq!(bodies, vec!["b0", "b1", "b2", "b0", "b1", "b2"]);
}

#[tokio::test]
async fn test_empty_registry_returns_500() {
    let proxy = TestProxy::start(ProxyConfig::default()).await;

    let res = common::client().get(proxy.url("/api/x")).send().await.unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "No backends configured");
}

#[tokio::test]
async fn test_unreachable_backend_returns_502_without_failover() {
    let dead = common::closed_addr().await;
    let alive = common::start_fixed_backend(StatusCode::OK, "alive").await;

    let mut config = ProxyConfig::default();
    config.backends = vec![dead.to_string(), alive.to_string()];
    let proxy = TestProxy::start(config).await;

    let client = common::client();
    let first = client.get(proxy.url("/api/x")).send().await.unwrap();
    assert_eq!(first.status(), 502);

    let second = client.get(proxy.url("/api/x")).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn test_backend_errors_are_relayed_verbatim() {
    let backend = common::start_fixed_backend(StatusCode::NOT_FOUND, "missing").await;

    let mut config = ProxyConfig::default();
    config.backends.push(backend.to_string());
    let proxy = TestProxy::start(config).await;

    let res = common::client().get(proxy.url("/api/nope")).send().await.unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "missing");
}

#[tokio::test]
async fn test_request_is_forwarded_with_rewritten_host() {
    let backend = common::start_echo_backend().await;

    let mut config = ProxyConfig::default();
    config.backends.push(format!("http://{}", backend));
    let proxy = TestProxy::start(config).await;

    let res = common::client()
        .post(proxy.url("/api/items?x=1&y=2"))
        .header("x-custom", "kept")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/api/items");
    assert_eq!(echo["query"], "x=1&y=2");
    assert_eq!(echo["host"], backend.to_string());
    assert_eq!(echo["x_custom"], "kept");
    assert_eq!(echo["x_forwarded_for"], "127.0.0.1");
    assert_eq!(echo["body"], "hello");
    assert!(echo["x_request_id"].is_string());
}

#[tokio::test]
async fn test_backend_base_path_is_prefixed() {
    let backend = common::start_echo_backend().await;

    let mut config = ProxyConfig::default();
    config.backends.push(format!("http://{}/v2", backend));
    let proxy = TestProxy::start(config).await;

    let echo: Value = common::client()
        .get(proxy.url("/api/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["path"], "/v2/api/users");
}

#[tokio::test]
async fn test_routes_outside_api_are_not_proxied() {
    let backend = common::start_mock_backend("ok").await;

    let mut config = ProxyConfig::default();
    config.backends.push(backend.to_string());
    let proxy = TestProxy::start(config).await;

    let res = common::client().get(proxy.url("/other")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_backend_response_headers_are_relayed() {
    let backend = common::start_backend(Router::new().fallback(|| async {
        (
            StatusCode::CREATED,
            [("x-backend", "yes"), (SET_COOKIE.as_str(), "a=b")],
            "made",
        )
    }))
    .await;

    let mut config = ProxyConfig::default();
    config.backends.push(backend.to_string());
    let proxy = TestProxy::start(config).await;

    let res = common::client().post(proxy.url("/api/things")).send().await.unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-backend"], "yes");
    assert_eq!(res.headers()[SET_COOKIE], "a=b");
    assert_eq!(res.text().await.unwrap(), "made");
}

#[tokio::test]
async fn test_slow_backend_is_gateway_timeout() {
    let backend = common::start_backend(Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        "late"
    }))
    .await;

    let mut config = ProxyConfig::default();
    config.backends.push(backend.to_string());
    config.timeouts.request_secs = 1;
    let proxy = TestProxy::start(config).await;

    let res = common::client().get(proxy.url("/api/slow")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT.as_u16());
}
