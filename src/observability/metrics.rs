//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): forwarded requests by route, status, error
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_response_bytes_total` (counter): relayed body bytes by route
//! - `gateway_upstream_health` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_outcomes_dropped_total` (counter): records lost to a full sink
//! - `gateway_config_reloads_total` (counter): reloads by result
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::observability::outcome::ForwardOutcome;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_outcome(outcome: &ForwardOutcome) {
    let status = outcome
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string());
    counter!(
        "gateway_requests_total",
        "route" => outcome.route.clone(),
        "status" => status,
        "error" => outcome.error.unwrap_or("none"),
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => outcome.route.clone())
        .record(outcome.latency.as_secs_f64());
    counter!("gateway_response_bytes_total", "route" => outcome.route.clone())
        .increment(outcome.bytes);
}

pub fn record_upstream_health(address: &str, healthy: bool) {
    gauge!("gateway_upstream_health", "upstream" => address.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_outcome_dropped() {
    counter!("gateway_outcomes_dropped_total").increment(1);
}

pub fn record_reload(accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    counter!("gateway_config_reloads_total", "result" => result).increment(1);
}
