//! Health probe protocols.
//!
//! Probes are pluggable through [`Probe`]. The default is a TCP connect;
//! `HEAD <path>` probing checks the status against a configured set.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::ProbeConfig;
use crate::load_balancer::Upstream;

const PROBE_USER_AGENT: &str = "prefix-gateway-health-check";

/// Why a probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// A liveness check against one upstream.
pub trait Probe: Send + Sync + 'static {
    fn probe<'a>(&'a self, upstream: &'a Upstream) -> BoxFuture<'a, Result<(), ProbeError>>;
}

/// Healthy when a TCP connection can be established.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl Probe for TcpProbe {
    fn probe<'a>(&'a self, upstream: &'a Upstream) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            let stream = TcpStream::connect(upstream.address()).await?;
            drop(stream);
            Ok(())
        })
    }
}

/// Healthy when `HEAD <path>` answers with an expected status.
#[derive(Clone)]
pub struct HttpHeadProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    expected_statuses: Vec<u16>,
}

impl HttpHeadProbe {
    pub fn new(path: impl Into<String>, expected_statuses: Vec<u16>) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());
        Self {
            client,
            path: path.into(),
            expected_statuses,
        }
    }
}

impl Probe for HttpHeadProbe {
    fn probe<'a>(&'a self, upstream: &'a Upstream) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            let request = Request::builder()
                .method(Method::HEAD)
                .uri(format!("http://{}{}", upstream.authority(), self.path))
                .header(header::USER_AGENT, PROBE_USER_AGENT)
                .body(Body::empty())
                .map_err(|e| ProbeError::Request(e.to_string()))?;

            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| ProbeError::Request(e.to_string()))?;

            let status = response.status().as_u16();
            if self.expected_statuses.contains(&status) {
                Ok(())
            } else {
                Err(ProbeError::UnexpectedStatus(status))
            }
        })
    }
}

/// Build the probe selected by configuration.
pub fn probe_from_config(config: &ProbeConfig) -> Arc<dyn Probe> {
    match config {
        ProbeConfig::Tcp => Arc::new(TcpProbe),
        ProbeConfig::HttpHead {
            path,
            expected_statuses,
        } => Arc::new(HttpHeadProbe::new(path.clone(), expected_statuses.clone())),
    }
}
