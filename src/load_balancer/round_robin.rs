//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::upstream::Upstream;

/// Round-robin selector.
/// Stores an internal counter to rotate through upstreams.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next healthy upstream, skipping `exclude` when given.
    ///
    /// The cursor cycles over the eligible members only, so a condemned
    /// member's turn is not handed to its neighbour.
    pub fn next(
        &self,
        members: &[Arc<Upstream>],
        exclude: Option<&Arc<Upstream>>,
    ) -> Option<Arc<Upstream>> {
        let eligible = |upstream: &&Arc<Upstream>| {
            upstream.is_healthy() && !exclude.is_some_and(|e| Arc::ptr_eq(e, upstream))
        };

        let count = members.iter().filter(eligible).count();
        if count == 0 {
            return None;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        // Health may flip between the two passes.
        members
            .iter()
            .filter(eligible)
            .nth(start % count)
            .or_else(|| members.iter().find(eligible))
            .cloned()
    }
}
