//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every upstream, one independent task each
//! - Update upstream health state based on results
//!
//! Tasks start at a random offset within the interval and sleep a jittered
//! interval between probes, so upstreams are not probed in lockstep.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::probe::{probe_from_config, Probe};
use crate::health::state::{HealthThresholds, HealthTransition};
use crate::load_balancer::Upstream;
use crate::observability::metrics;

/// Spawns probe loops for a set of upstreams.
pub struct HealthMonitor {
    config: HealthCheckConfig,
    probe: Arc<dyn Probe>,
}

#[derive(Clone, Copy)]
struct ProbeSchedule {
    interval: Duration,
    timeout: Duration,
    jitter_ratio: f64,
    thresholds: HealthThresholds,
}

impl HealthMonitor {
    /// Monitor using the probe protocol named in `config`.
    pub fn new(config: HealthCheckConfig) -> Self {
        let probe = probe_from_config(&config.probe);
        Self { config, probe }
    }

    /// Monitor using a caller-supplied probe.
    pub fn with_probe(config: HealthCheckConfig, probe: Arc<dyn Probe>) -> Self {
        Self { config, probe }
    }

    /// Start one probe loop per upstream. Dropping the handle stops them.
    pub fn spawn(&self, upstreams: Vec<Arc<Upstream>>) -> MonitorHandle {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return MonitorHandle::default();
        }

        let schedule = ProbeSchedule {
            interval: Duration::from_millis(self.config.interval_ms),
            timeout: Duration::from_millis(self.config.timeout_ms),
            jitter_ratio: self.config.jitter_ratio,
            thresholds: HealthThresholds::from(&self.config),
        };

        tracing::info!(
            upstreams = upstreams.len(),
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            "Health monitor starting"
        );

        let tasks = upstreams
            .into_iter()
            .map(|upstream| tokio::spawn(probe_loop(upstream, self.probe.clone(), schedule)))
            .collect();
        MonitorHandle { tasks }
    }
}

/// Owns the probe tasks of one snapshot generation.
#[derive(Default)]
pub struct MonitorHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Number of probe loops owned by this handle.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn probe_loop(upstream: Arc<Upstream>, probe: Arc<dyn Probe>, schedule: ProbeSchedule) {
    time::sleep(initial_offset(schedule.interval)).await;

    loop {
        let healthy = match time::timeout(schedule.timeout, probe.probe(&upstream)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(upstream = %upstream.address(), error = %e, "Health probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(upstream = %upstream.address(), "Health probe timed out");
                false
            }
        };

        let transition = if healthy {
            upstream.mark_success(schedule.thresholds)
        } else {
            upstream.mark_failure(schedule.thresholds)
        };

        match transition {
            Some(HealthTransition::BecameUnhealthy) => tracing::warn!(
                upstream = %upstream.address(),
                consecutive_failures = upstream.consecutive_failures(),
                "Upstream marked unhealthy"
            ),
            Some(HealthTransition::BecameHealthy) => {
                tracing::info!(upstream = %upstream.address(), "Upstream recovered")
            }
            None => {}
        }
        metrics::record_upstream_health(upstream.address(), upstream.is_healthy());

        time::sleep(jittered(schedule.interval, schedule.jitter_ratio)).await;
    }
}

fn initial_offset(interval: Duration) -> Duration {
    let max = interval.as_millis() as u64;
    if max == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max))
}

/// `interval` shifted by a random amount within `±interval * ratio / 2`.
pub(crate) fn jittered(interval: Duration, ratio: f64) -> Duration {
    let spread = (interval.as_millis() as f64 * ratio.clamp(0.0, 1.0)) as u64;
    if spread == 0 {
        return interval;
    }
    let offset = rand::thread_rng().gen_range(0..=spread);
    interval.saturating_sub(Duration::from_millis(spread / 2)) + Duration::from_millis(offset)
}
