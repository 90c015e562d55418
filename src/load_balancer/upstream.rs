//! Upstream abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track active connections (atomic, per forwarded request)
//! - Track health state and probe history
//!
//! Health fields are written only by the health monitor; the connection
//! count only by upstream leases. Everything is atomic so the request path
//! never takes a lock.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::uri::{Authority, InvalidUri};

use crate::health::state::{HealthThresholds, HealthTransition};

/// A single upstream server.
#[derive(Debug)]
pub struct Upstream {
    /// The configured `host:port`.
    address: String,
    /// Pre-parsed authority used to build upstream URIs.
    authority: Authority,
    /// Number of requests currently forwarded to this upstream.
    active_connections: AtomicUsize,
    /// Current health flag. Upstreams start healthy.
    healthy: AtomicBool,
    /// Consecutive failure count.
    consecutive_failures: AtomicU32,
    /// Consecutive success count.
    consecutive_successes: AtomicU32,
    /// Last probe time in milliseconds since the Unix epoch, 0 when never probed.
    last_probe_at: AtomicU64,
}

impl Upstream {
    /// Create a new upstream from a `host:port` address.
    pub fn new(address: &str) -> Result<Self, InvalidUri> {
        let authority = Authority::from_str(address)?;
        Ok(Self {
            address: address.to_string(),
            authority,
            active_connections: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            last_probe_at: AtomicU64::new(0),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    pub(crate) fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn dec_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Time of the most recent probe, if any.
    pub fn last_probe_at(&self) -> Option<SystemTime> {
        match self.last_probe_at.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(UNIX_EPOCH + Duration::from_millis(ms)),
        }
    }

    fn touch_probe_time(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(1)
            .max(1);
        self.last_probe_at.store(now, Ordering::Relaxed);
    }

    // --- Health Logic ---

    /// Take over the health record of the same address from an earlier
    /// generation. Connection counts stay with their own generation.
    pub fn inherit_health(&self, previous: &Upstream) {
        self.healthy.store(previous.is_healthy(), Ordering::Release);
        self.consecutive_failures
            .store(previous.consecutive_failures.load(Ordering::Relaxed), Ordering::Relaxed);
        self.consecutive_successes
            .store(previous.consecutive_successes.load(Ordering::Relaxed), Ordering::Relaxed);
        self.last_probe_at
            .store(previous.last_probe_at.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Record a successful probe.
    pub fn mark_success(&self, thresholds: HealthThresholds) -> Option<HealthTransition> {
        self.touch_probe_time();
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.is_healthy() {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= thresholds.healthy {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.healthy.store(true, Ordering::Release);
            return Some(HealthTransition::BecameHealthy);
        }
        None
    }

    /// Record a failed probe.
    pub fn mark_failure(&self, thresholds: HealthThresholds) -> Option<HealthTransition> {
        self.touch_probe_time();
        self.consecutive_successes.store(0, Ordering::Relaxed);

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if self.is_healthy() && failures >= thresholds.unhealthy {
            self.healthy.store(false, Ordering::Release);
            return Some(HealthTransition::BecameUnhealthy);
        }
        None
    }
}

/// A claim on an upstream for one forwarded request.
///
/// Selecting an upstream increments its connection count; the lease
/// decrements it exactly once, either through [`UpstreamLease::release`] or
/// when dropped.
#[derive(Debug)]
pub struct UpstreamLease {
    upstream: Arc<Upstream>,
}

impl UpstreamLease {
    pub(crate) fn acquire(upstream: Arc<Upstream>) -> Self {
        upstream.inc_connections();
        Self { upstream }
    }

    pub fn upstream(&self) -> &Arc<Upstream> {
        &self.upstream
    }

    /// Give the upstream back explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for UpstreamLease {
    fn drop(&mut self) {
        self.upstream.dec_connections();
    }
}
