//! Published gateway state.
//!
//! A [`Snapshot`] bundles one generation of the route table and the upstream
//! pool. Readers load the current snapshot through [`ArcSwap`] and keep
//! whatever they matched alive by `Arc`, so a reload never disturbs requests
//! already in flight.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::{ConfigError, GatewayConfig};
use crate::load_balancer::{UpstreamGroup, UpstreamPool};
use crate::routing::{Route, RouteTable};

/// One immutable configuration generation.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub routes: RouteTable,
    pub pool: UpstreamPool,
}

/// A route together with the upstream group serving it.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub group: Arc<UpstreamGroup>,
}

impl Snapshot {
    /// Compile a validated configuration into a snapshot.
    ///
    /// Upstreams already present in `previous` keep their health record, so
    /// a reload never revives a condemned upstream. Nothing is published
    /// here; a failure leaves no trace.
    pub fn build(
        config: &GatewayConfig,
        generation: u64,
        previous: Option<&Snapshot>,
    ) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let mut pool = UpstreamPool::new();
        let mut routes = Vec::with_capacity(config.routes.len());
        for route in &config.routes {
            let group = pool.add_group(&route.upstreams).map_err(|_| {
                ConfigError::Validation(vec![ValidationError::InvalidUpstream {
                    prefix: route.prefix.clone(),
                    address: route.upstreams.join(","),
                }])
            })?;
            routes.push(
                Route::new(route.prefix.clone(), group, Duration::from_millis(route.timeout_ms))
                    .with_strip_prefix(route.strip_prefix)
                    .with_preserve_host(route.preserve_host),
            );
        }

        let routes = RouteTable::new(routes).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::DuplicatePrefix {
                index: e.index,
                prefix: e.prefix,
            }])
        })?;

        if let Some(previous) = previous {
            pool.inherit_health(&previous.pool);
        }

        Ok(Self {
            generation,
            routes,
            pool,
        })
    }

    /// Match a path and resolve its upstream group.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let route = self.routes.match_path(path)?;
        let group = self.pool.group(route.group)?;
        Some(RouteMatch {
            route: route.clone(),
            group: group.clone(),
        })
    }
}

/// Shared, atomically replaceable snapshot pointer.
pub type SharedSnapshot = Arc<ArcSwap<Snapshot>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::health::state::HealthThresholds;

    #[test]
    fn test_build_and_match() {
        let mut api = RouteConfig::new("/api", vec!["localhost:9001".into()]);
        api.strip_prefix = true;
        api.timeout_ms = 2000;
        let config = GatewayConfig {
            routes: vec![
                api,
                RouteConfig::new("/api/admin", vec!["localhost:9002".into(), "localhost:9003".into()]),
            ],
            ..GatewayConfig::default()
        };

        let snapshot = Snapshot::build(&config, 7, None).unwrap();
        assert_eq!(snapshot.generation, 7);

        let m = snapshot.match_path("/api/users").unwrap();
        assert_eq!(m.route.prefix(), "/api");
        assert!(m.route.strip_prefix);
        assert_eq!(m.route.timeout, Duration::from_millis(2000));
        assert_eq!(m.group.members()[0].address(), "localhost:9001");

        let m = snapshot.match_path("/api/admin/x").unwrap();
        assert_eq!(m.group.members().len(), 2);

        assert!(snapshot.match_path("/nope").is_none());
    }

    #[test]
    fn test_build_rejects_invalid() {
        let config = GatewayConfig {
            routes: vec![RouteConfig::new("/api", vec![])],
            ..GatewayConfig::default()
        };
        assert!(matches!(
            Snapshot::build(&config, 1, None),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rebuild_keeps_condemned_upstream() {
        let config = GatewayConfig {
            routes: vec![RouteConfig::new(
                "/",
                vec!["localhost:9001".into(), "localhost:9002".into()],
            )],
            ..GatewayConfig::default()
        };
        let first = Snapshot::build(&config, 1, None).unwrap();
        let condemned = first.pool.all_upstreams()[0].clone();
        for _ in 0..3 {
            condemned.mark_failure(HealthThresholds::default());
        }

        let second = Snapshot::build(&config, 2, Some(&first)).unwrap();
        let group = second.match_path("/").unwrap().group;
        assert!(!group.members()[0].is_healthy());
        for _ in 0..4 {
            assert_eq!(group.select().unwrap().upstream().address(), "localhost:9002");
        }

        // A fresh build starts everyone healthy.
        let fresh = Snapshot::build(&config, 3, None).unwrap();
        assert!(fresh.pool.all_upstreams().iter().all(|u| u.is_healthy()));
    }
}
