//! Upstream health state machine.
//!
//! # States
//! - Healthy: upstream receives traffic
//! - Unhealthy: upstream excluded from selection
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= unhealthy_threshold (default 3)
//! Unhealthy → Healthy: consecutive successes >= healthy_threshold (default 1)
//! ```
//!
//! Condemnation is slow and recovery is fast: a single transient error never
//! evicts an upstream, a single good probe brings it back.

use crate::config::HealthCheckConfig;

/// Consecutive-result thresholds for state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub unhealthy: u32,
    pub healthy: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            unhealthy: 3,
            healthy: 1,
        }
    }
}

impl From<&HealthCheckConfig> for HealthThresholds {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            unhealthy: config.unhealthy_threshold.max(1),
            healthy: config.healthy_threshold.max(1),
        }
    }
}

/// A state change caused by a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    BecameHealthy,
    BecameUnhealthy,
}
