//! Failure injection: dead, hanging, malformed and stalling upstreams.

use std::time::{Duration, Instant};

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_timeout_returns_504_and_releases_upstream() {
    let backend = common::start_hanging_backend().await;
    let mut config = common::config_for(&[("/slow", vec![backend])]);
    config.routes[0].timeout_ms = 200;
    let mut gw = common::start_gateway(config).await;

    let start = Instant::now();
    let res = common::client().get(gw.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(start.elapsed() < Duration::from_secs(2));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream_timeout");

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.status, Some(504));
    assert_eq!(outcome.error, Some("upstream_timeout"));

    let group = gw.gateway.match_path("/slow").unwrap().group;
    assert!(common::wait_until(|| group.members()[0].active_connections() == 0).await);
}

#[tokio::test]
async fn test_timeout_covers_response_body() {
    let backend = common::start_stalling_backend().await;
    let mut config = common::config_for(&[("/", vec![backend])]);
    config.routes[0].timeout_ms = 300;
    let mut gw = common::start_gateway(config).await;

    let start = Instant::now();
    let res = common::client().get(gw.url("/stall")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.bytes().await.is_err());
    assert!(start.elapsed() < Duration::from_secs(3));

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.status, Some(200));
    assert_eq!(outcome.error, Some("upstream_timeout"));
    assert_eq!(outcome.bytes, "partial".len() as u64);
}

#[tokio::test]
async fn test_malformed_upstream_response() {
    let backend = common::start_raw_backend(b"NOT HTTP AT ALL\r\n\r\n").await;
    let mut gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "malformed_upstream_response");
    assert!(!body.to_string().contains(&backend.to_string()));

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_upstream_closes_mid_body() {
    let backend =
        common::start_raw_backend(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort").await;
    let mut gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.bytes().await.is_err());

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.status, Some(200));
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_connection_refused_returns_502() {
    let dead = common::dead_address().await;
    let gw = common::start_gateway(common::config_for(&[("/", vec![dead])])).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream_connection_failed");
}

#[tokio::test]
async fn test_retry_on_other_upstream() {
    let dead = common::dead_address().await;
    let live = common::start_echo_backend().await;
    let mut gw = common::start_gateway(common::config_for(&[("/", vec![dead, live])])).await;

    // The first pick is the dead member; the single retry lands on the live one.
    let res = common::client()
        .post(gw.url("/retry"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "hello");

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.upstream, Some(live.to_string()));
}

#[tokio::test]
async fn test_retry_disabled() {
    let dead = common::dead_address().await;
    let live = common::start_echo_backend().await;
    let mut config = common::config_for(&[("/", vec![dead, live])]);
    config.retries.enabled = false;
    let gw = common::start_gateway(config).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_all_unhealthy_returns_503() {
    let dead = common::dead_address().await;
    let mut config = common::config_for(&[("/", vec![dead])]);
    config.health_check.enabled = true;
    config.health_check.interval_ms = 20;
    config.health_check.timeout_ms = 100;
    config.health_check.jitter_ratio = 0.0;
    config.health_check.unhealthy_threshold = 2;
    let mut gw = common::start_gateway(config).await;

    let group = gw.gateway.match_path("/").unwrap().group;
    assert!(common::wait_until(|| !group.members()[0].is_healthy()).await);

    let res = common::client().get(gw.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "service_unavailable");

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.status, Some(503));
    assert_eq!(outcome.attempts, 0);
    assert!(outcome.upstream.is_none());
}

#[tokio::test]
async fn test_unhealthy_upstream_skipped() {
    let dead = common::dead_address().await;
    let live = common::start_named_backend("live").await;
    let mut config = common::config_for(&[("/", vec![dead, live])]);
    config.health_check.enabled = true;
    config.health_check.interval_ms = 20;
    config.health_check.jitter_ratio = 0.0;
    config.health_check.unhealthy_threshold = 1;
    let mut gw = common::start_gateway(config).await;

    let group = gw.gateway.match_path("/").unwrap().group;
    assert!(common::wait_until(|| !group.members()[0].is_healthy()).await);
    assert!(group.members()[1].is_healthy());

    let client = common::client();
    for _ in 0..4 {
        let body = client.get(gw.url("/")).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, "live");
        assert_eq!(gw.next_outcome().await.attempts, 1);
    }
}

#[tokio::test]
async fn test_client_disconnect_releases_upstream() {
    let backend = common::start_hanging_backend().await;
    let mut gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    assert!(client.get(gw.url("/hang")).send().await.is_err());

    let group = gw.gateway.match_path("/").unwrap().group;
    assert!(common::wait_until(|| group.members()[0].active_connections() == 0).await);
    assert_eq!(gw.next_outcome().await.error, Some("client_disconnected"));
}
