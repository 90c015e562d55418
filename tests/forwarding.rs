//! End-to-end forwarding through a live gateway.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_strip_prefix_keeps_query() {
    let backend = common::start_echo_backend().await;
    let mut config = common::config_for(&[("/api", vec![backend])]);
    config.routes[0].strip_prefix = true;
    let gw = common::start_gateway(config).await;

    let res = common::client()
        .get(gw.url("/api/users?id=5"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-seen-path"], "/users?id=5");
}

#[tokio::test]
async fn test_strip_prefix_exact_match_becomes_root() {
    let backend = common::start_echo_backend().await;
    let mut config = common::config_for(&[("/api", vec![backend])]);
    config.routes[0].strip_prefix = true;
    let gw = common::start_gateway(config).await;

    let res = common::client().get(gw.url("/api")).send().await.unwrap();
    assert_eq!(res.headers()["x-seen-path"], "/");
}

#[tokio::test]
async fn test_path_forwarded_unchanged_without_strip() {
    let backend = common::start_echo_backend().await;
    let gw = common::start_gateway(common::config_for(&[("/api", vec![backend])])).await;

    let res = common::client()
        .delete(gw.url("/api/items/7"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-seen-path"], "/api/items/7");
    assert_eq!(res.headers()["x-seen-method"], "DELETE");
}

#[tokio::test]
async fn test_longest_prefix_wins() {
    let general = common::start_named_backend("general").await;
    let admin = common::start_named_backend("admin").await;
    let gw = common::start_gateway(common::config_for(&[
        ("/api", vec![general]),
        ("/api/admin", vec![admin]),
    ]))
    .await;

    let client = common::client();
    let body = client.get(gw.url("/api/admin/users")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "admin");
    let body = client.get(gw.url("/api/users")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "general");
    // Segment boundary: "/apix" is not under "/api".
    let res = client.get(gw.url("/apix")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_route_not_found_json() {
    let backend = common::start_echo_backend().await;
    let gw = common::start_gateway(common::config_for(&[("/api", vec![backend])])).await;

    let res = common::client().get(gw.url("/other")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "route_not_found");
}

#[tokio::test]
async fn test_echo_bodies_byte_identical() {
    let backend = common::start_echo_backend().await;
    let gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;
    let client = common::client();

    for size in [0usize, 1, 10 * 1024 * 1024] {
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let res = client
            .post(gw.url("/echo"))
            .body(payload.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.bytes().await.unwrap();
        assert_eq!(body.len(), size);
        assert!(body[..] == payload[..], "body mismatch for {size} bytes");
    }
}

#[tokio::test]
async fn test_forwarding_headers() {
    let backend = common::start_echo_backend().await;
    let gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;

    let res = common::client()
        .get(gw.url("/h"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-seen-host"], backend.to_string().as_str());
    assert_eq!(res.headers()["x-seen-forwarded-host"], gw.addr.to_string().as_str());
    assert_eq!(res.headers()["x-seen-forwarded-for"], "127.0.0.1");
    assert_eq!(res.headers()["x-seen-request-id"], "trace-42");
    assert_eq!(res.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_request_id_generated() {
    let backend = common::start_echo_backend().await;
    let gw = common::start_gateway(common::config_for(&[("/", vec![backend])])).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    let id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(id.len(), 36);
    assert_eq!(res.headers()["x-seen-request-id"], id.as_str());
}

#[tokio::test]
async fn test_preserve_host() {
    let backend = common::start_echo_backend().await;
    let mut config = common::config_for(&[("/", vec![backend])]);
    config.routes[0].preserve_host = true;
    let gw = common::start_gateway(config).await;

    let res = common::client().get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.headers()["x-seen-host"], gw.addr.to_string().as_str());
}

#[tokio::test]
async fn test_round_robin_across_upstreams() {
    let a = common::start_named_backend("a").await;
    let b = common::start_named_backend("b").await;
    let gw = common::start_gateway(common::config_for(&[("/", vec![a, b])])).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..4 {
        bodies.push(client.get(gw.url("/")).send().await.unwrap().text().await.unwrap());
    }
    assert_eq!(bodies, vec!["a", "b", "a", "b"]);
}

#[tokio::test]
async fn test_outcome_records_status_and_bytes() {
    let backend = common::start_named_backend("twelve bytes").await;
    let mut gw = common::start_gateway(common::config_for(&[("/svc", vec![backend])])).await;

    let res = common::client().get(gw.url("/svc/x")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "twelve bytes");

    let outcome = gw.next_outcome().await;
    assert_eq!(outcome.status, Some(200));
    assert_eq!(outcome.bytes, 12);
    assert_eq!(outcome.route, "/svc");
    assert_eq!(outcome.path, "/svc/x");
    assert_eq!(outcome.upstream, Some(backend.to_string()));
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.error.is_none());
    assert!(outcome.request_id.is_some());

    let group = gw.gateway.match_path("/svc").unwrap().group;
    assert!(common::wait_until(|| group.members()[0].active_connections() == 0).await);
}
