//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered route definitions. Registration order breaks prefix ties.
    pub routes: Vec<RouteConfig>,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Upstream client and lifecycle timeouts.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). `--listen` overrides it.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A prefix route and the upstreams it forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match, e.g. "/api".
    pub prefix: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Upstream addresses as `host:port`.
    pub upstreams: Vec<String>,

    /// Full round-trip deadline in milliseconds.
    #[serde(default = "default_route_timeout_ms")]
    pub timeout_ms: u64,

    /// Forward the client's Host header instead of the upstream authority.
    #[serde(default)]
    pub preserve_host: bool,
}

impl RouteConfig {
    /// Route with default flags, mostly useful for tests and programmatic setup.
    pub fn new(prefix: impl Into<String>, upstreams: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            strip_prefix: false,
            upstreams,
            timeout_ms: default_route_timeout_ms(),
            preserve_host: false,
        }
    }
}

fn default_route_timeout_ms() -> u64 {
    30_000
}

/// Health probe protocol.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// Plain TCP connect.
    Tcp,
    /// `HEAD <path>`, healthy when the status is in `expected_statuses`.
    HttpHead {
        #[serde(default = "default_probe_path")]
        path: String,
        #[serde(default = "default_expected_statuses")]
        expected_statuses: Vec<u16>,
    },
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig::Tcp
    }
}

fn default_probe_path() -> String {
    "/".to_string()
}

fn default_expected_statuses() -> Vec<u16> {
    vec![200]
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Fraction of the interval used as random jitter (0.0 - 1.0).
    pub jitter_ratio: f64,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,

    /// Probe protocol.
    pub probe: ProbeConfig,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            timeout_ms: 2_000,
            jitter_ratio: 0.1,
            unhealthy_threshold: 3,
            healthy_threshold: 1,
            probe: ProbeConfig::Tcp,
        }
    }
}

/// Timeout configuration for the upstream client and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout in milliseconds (the route deadline still applies).
    pub connect_ms: u64,

    /// Idle pooled upstream connections are closed after this many milliseconds.
    pub pool_idle_ms: u64,

    /// Maximum idle pooled connections kept per upstream.
    pub pool_max_idle_per_host: usize,

    /// How long shutdown waits for in-flight requests to drain.
    pub shutdown_grace_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            pool_idle_ms: 90_000,
            pool_max_idle_per_host: 32,
            shutdown_grace_ms: 10_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry once against another upstream on transport failure.
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter used when RUST_LOG is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Prometheus exporter bind address; disabled when absent.
    pub metrics_address: Option<String>,

    /// Capacity of the forwarding-outcome buffer.
    pub outcome_buffer: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "prefix_gateway=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
            outcome_buffer: 4096,
        }
    }
}
