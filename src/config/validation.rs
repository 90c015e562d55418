//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject duplicate prefixes and empty upstream lists
//! - Validate value ranges (route and connect timeouts > 0, thresholds >= 1, status codes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, so a bad reload never
//!   partially applies

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, HealthCheckConfig, ProbeConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index}: prefix {prefix:?} must start with '/'")]
    InvalidPrefix { index: usize, prefix: String },
    #[error("route #{index}: duplicate prefix {prefix:?}")]
    DuplicatePrefix { index: usize, prefix: String },
    #[error("route {prefix:?}: upstream list is empty")]
    EmptyUpstreams { prefix: String },
    #[error("route {prefix:?}: upstream {address:?} is not a valid host:port")]
    InvalidUpstream { prefix: String, address: String },
    #[error("route {prefix:?}: timeout_ms must be greater than zero")]
    ZeroTimeout { prefix: String },
    #[error("timeouts.{field} must be greater than zero")]
    ZeroGlobalTimeout { field: &'static str },
    #[error("health_check: {0}")]
    HealthCheck(String),
    #[error("{field}: {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, route) in config.routes.iter().enumerate() {
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                index,
                prefix: route.prefix.clone(),
            });
        }
        if !seen.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix {
                index,
                prefix: route.prefix.clone(),
            });
        }
        if route.upstreams.is_empty() {
            errors.push(ValidationError::EmptyUpstreams {
                prefix: route.prefix.clone(),
            });
        }
        for address in &route.upstreams {
            if !is_host_port(address) {
                errors.push(ValidationError::InvalidUpstream {
                    prefix: route.prefix.clone(),
                    address: address.clone(),
                });
            }
        }
        if route.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout {
                prefix: route.prefix.clone(),
            });
        }
    }

    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::ZeroGlobalTimeout { field: "connect_ms" });
    }

    validate_health_check(&config.health_check, &mut errors);

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "observability.metrics_address",
                value: addr.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_health_check(config: &HealthCheckConfig, errors: &mut Vec<ValidationError>) {
    if config.interval_ms == 0 {
        errors.push(ValidationError::HealthCheck("interval_ms must be greater than zero".into()));
    }
    if config.timeout_ms == 0 {
        errors.push(ValidationError::HealthCheck("timeout_ms must be greater than zero".into()));
    }
    if !(0.0..=1.0).contains(&config.jitter_ratio) {
        errors.push(ValidationError::HealthCheck("jitter_ratio must be within 0.0..=1.0".into()));
    }
    if config.unhealthy_threshold == 0 || config.healthy_threshold == 0 {
        errors.push(ValidationError::HealthCheck("thresholds must be at least 1".into()));
    }
    if let ProbeConfig::HttpHead { path, expected_statuses } = &config.probe {
        if !path.starts_with('/') {
            errors.push(ValidationError::HealthCheck(format!(
                "probe path {path:?} must start with '/'"
            )));
        }
        if expected_statuses.is_empty() {
            errors.push(ValidationError::HealthCheck("expected_statuses is empty".into()));
        }
        for status in expected_statuses {
            if !(100..=599).contains(status) {
                errors.push(ValidationError::HealthCheck(format!(
                    "expected status {status} is not a valid HTTP status"
                )));
            }
        }
    }
}

/// `host:port` with an explicit port and nothing else (no scheme, path or userinfo).
pub(crate) fn is_host_port(address: &str) -> bool {
    match Authority::from_str(address) {
        Ok(authority) => {
            authority.as_str() == address
                && !address.contains('@')
                && !authority.host().is_empty()
                && authority.port_u16().is_some()
        }
        Err(_) => false,
    }
}
