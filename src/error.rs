//! Gateway error taxonomy.
//!
//! Every per-request failure is a [`GatewayError`]. The front-end converts
//! these into a status code plus a stable machine-readable tag; nothing
//! internal (addresses, source errors) reaches the client.

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::load_balancer::pool::GroupId;

/// Errors produced while matching and forwarding a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route prefix matched the request path.
    #[error("no route matches path {path}")]
    RouteNotFound { path: String },

    /// Every member of the upstream group is flagged unhealthy.
    #[error("no healthy upstream in group {group}")]
    NoHealthyUpstream { group: GroupId },

    /// The request deadline expired.
    #[error("upstream did not complete within {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// Connecting to or talking with the upstream failed at the transport level.
    #[error("upstream connection failed: {reason}")]
    UpstreamConnectionFailed { reason: String },

    /// The upstream answered with something that is not valid HTTP.
    #[error("malformed upstream response: {reason}")]
    MalformedUpstreamResponse { reason: String },

    /// The original caller went away before the exchange finished.
    #[error("client disconnected")]
    ClientDisconnected,

    /// A configuration was rejected.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),

    /// Anything else inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status presented to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::NoHealthyUpstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamConnectionFailed { .. }
            | GatewayError::MalformedUpstreamResponse { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::ClientDisconnected
            | GatewayError::ConfigInvalid(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable tag used in response bodies, logs and outcome records.
    pub fn tag(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::NoHealthyUpstream { .. } => "service_unavailable",
            GatewayError::UpstreamTimeout { .. } => "upstream_timeout",
            GatewayError::UpstreamConnectionFailed { .. } => "upstream_connection_failed",
            GatewayError::MalformedUpstreamResponse { .. } => "malformed_upstream_response",
            GatewayError::ClientDisconnected => "client_disconnected",
            GatewayError::ConfigInvalid(_) => "config_invalid",
            GatewayError::Internal(_) => "internal_error",
        }
    }

    /// Fixed client-facing message for this error class.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "No matching route found",
            GatewayError::NoHealthyUpstream { .. } => "No healthy upstream available",
            GatewayError::UpstreamTimeout { .. } => "Upstream did not respond in time",
            GatewayError::UpstreamConnectionFailed { .. } => "Upstream request failed",
            GatewayError::MalformedUpstreamResponse { .. } => "Upstream sent an invalid response",
            GatewayError::ClientDisconnected => "Client disconnected",
            GatewayError::ConfigInvalid(_) | GatewayError::Internal(_) => "Internal gateway error",
        }
    }

    /// Transport failures are the only errors eligible for the single retry.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, GatewayError::UpstreamConnectionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::RouteNotFound { path: "/x".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::NoHealthyUpstream { group: GroupId(0) }.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::UpstreamTimeout { timeout_ms: 10 }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::MalformedUpstreamResponse { reason: "bad".into() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_only_transport_failures_retry() {
        assert!(GatewayError::UpstreamConnectionFailed { reason: "reset".into() }
            .is_transport_failure());
        assert!(!GatewayError::UpstreamTimeout { timeout_ms: 1 }.is_transport_failure());
        assert!(!GatewayError::MalformedUpstreamResponse { reason: "x".into() }
            .is_transport_failure());
    }
}
