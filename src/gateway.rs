//! Gateway core: the published snapshot, the forwarding engine and the
//! health monitor of the current generation.
//!
//! Reload builds a complete new snapshot off to the side, swaps it in with a
//! single atomic store and only then restarts health probing for the new
//! upstreams. A rejected configuration changes nothing.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::{Request, Response},
};

use crate::config::{load_config, ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::forward::{EngineSettings, ForwardContext, ForwardingEngine};
use crate::health::{HealthMonitor, MonitorHandle};
use crate::observability::{metrics, OutcomeSink};
use crate::state::{RouteMatch, SharedSnapshot, Snapshot};

pub struct Gateway {
    snapshot: SharedSnapshot,
    engine: ForwardingEngine,
    monitor: Mutex<Option<MonitorHandle>>,
    generation: AtomicU64,
}

impl Gateway {
    /// Build generation 1 from `config` and start probing its upstreams.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: &GatewayConfig, sink: Arc<dyn OutcomeSink>) -> Result<Self, ConfigError> {
        let snapshot = Snapshot::build(config, 1, None)?;
        let engine = ForwardingEngine::new(&EngineSettings::from_config(config), sink);
        let gateway = Self {
            snapshot: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
            engine,
            monitor: Mutex::new(None),
            generation: AtomicU64::new(1),
        };
        gateway.publish(snapshot, config, &mut gateway.lock_monitor());
        Ok(gateway)
    }

    /// Validate and publish a new configuration; returns its generation.
    pub fn apply(&self, config: &GatewayConfig) -> Result<u64, ConfigError> {
        let mut monitor = self.lock_monitor();
        let generation = self.generation.load(Ordering::Acquire) + 1;

        let current = self.snapshot.load_full();
        let snapshot = match Snapshot::build(config, generation, Some(current.as_ref())) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Configuration rejected, keeping current generation");
                metrics::record_reload(false);
                return Err(e);
            }
        };

        self.generation.store(generation, Ordering::Release);
        self.publish(snapshot, config, &mut monitor);
        metrics::record_reload(true);
        Ok(generation)
    }

    /// Re-read `path` and apply it.
    pub fn reload_from(&self, path: &Path) -> Result<u64, ConfigError> {
        let config = load_config(path).inspect_err(|e| {
            tracing::error!(path = ?path, error = %e, "Reload failed, keeping current generation");
            metrics::record_reload(false);
        })?;
        self.apply(&config)
    }

    fn publish(
        &self,
        snapshot: Snapshot,
        config: &GatewayConfig,
        monitor: &mut Option<MonitorHandle>,
    ) {
        let snapshot = Arc::new(snapshot);
        let upstreams = snapshot.pool.all_upstreams();
        tracing::info!(
            generation = snapshot.generation,
            routes = snapshot.routes.len(),
            upstreams = upstreams.len(),
            "Publishing configuration"
        );
        self.snapshot.store(snapshot);

        // Old probe loops stop before the new ones start.
        drop(monitor.take());
        *monitor = Some(HealthMonitor::new(config.health_check.clone()).spawn(upstreams));
    }

    fn lock_monitor(&self) -> MutexGuard<'_, Option<MonitorHandle>> {
        self.monitor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The current snapshot. Holding it pins that generation.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.snapshot.load().match_path(path)
    }

    /// Route and forward one request.
    pub async fn handle(
        &self,
        request: Request<Body>,
        ctx: &ForwardContext,
    ) -> Result<Response<Body>, GatewayError> {
        let path = request.uri().path();
        let matched = self.match_path(path).ok_or_else(|| {
            tracing::debug!(path = %path, "No route matched");
            GatewayError::RouteNotFound {
                path: path.to_string(),
            }
        })?;
        self.engine.forward(request, &matched, ctx).await
    }

    /// Stop health probing; used on shutdown.
    pub fn stop_health_checks(&self) {
        drop(self.lock_monitor().take());
    }
}
