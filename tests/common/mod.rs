//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    response::Response,
    Router,
};
use prefix_gateway::config::{GatewayConfig, RouteConfig};
use prefix_gateway::observability::{ChannelSink, ForwardOutcome};
use prefix_gateway::{Gateway, GatewayServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub outcomes: mpsc::Receiver<ForwardOutcome>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Next outcome record, waiting up to a second.
    pub async fn next_outcome(&mut self) -> ForwardOutcome {
        tokio::time::timeout(Duration::from_secs(1), self.outcomes.recv())
            .await
            .expect("no outcome emitted")
            .expect("outcome channel closed")
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.gateway.stop_health_checks();
    }
}

/// Start a gateway for `config` on 127.0.0.1:0.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let (sink, outcomes) = ChannelSink::new(1024);
    let gateway = Arc::new(Gateway::new(&config, Arc::new(sink)).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::default();
    let server = GatewayServer::new(gateway.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        gateway,
        outcomes,
        shutdown,
    }
}

/// Config with health checks off and one route per `(prefix, upstreams)`.
pub fn config_for(routes: &[(&str, Vec<SocketAddr>)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.health_check.enabled = false;
    config.routes = routes
        .iter()
        .map(|(prefix, upstreams)| {
            RouteConfig::new(*prefix, upstreams.iter().map(|a| a.to_string()).collect())
        })
        .collect();
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn seen(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Echo backend: streams the request body back and reports what it saw in
/// `x-seen-*` response headers.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(|request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        Response::builder()
            .header("x-seen-path", path)
            .header("x-seen-method", parts.method.as_str())
            .header("x-seen-host", seen(&parts.headers, "host"))
            .header("x-seen-forwarded-for", seen(&parts.headers, "x-forwarded-for"))
            .header("x-seen-forwarded-host", seen(&parts.headers, "x-forwarded-host"))
            .header("x-seen-request-id", seen(&parts.headers, "x-request-id"))
            .body(body)
            .unwrap()
    });
    start_axum_backend(app).await
}

/// Backend that answers every request with a fixed body.
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    start_axum_backend(Router::new().fallback(move || async move { name })).await
}

pub async fn start_axum_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Raw TCP backend: reads the request head, writes `response`, closes.
pub async fn start_raw_backend(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Backend that accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Backend that sends a response head and a partial body, then stalls.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                    .await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    addr
}

/// An address nobody listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Poll `cond` for up to three seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
