//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the longest matching prefix for a path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by prefix length once, at build time; lookup is the
//!   first hit of an O(n) scan (acceptable for typical route counts)
//! - Stable sort keeps registration order among equal lengths

use std::sync::Arc;
use std::time::Duration;

use crate::load_balancer::GroupId;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    /// Remove the matched prefix before forwarding.
    pub strip_prefix: bool,
    /// Upstream group serving this route.
    pub group: GroupId,
    /// Full round-trip deadline.
    pub timeout: Duration,
    /// Keep the client's Host header.
    pub preserve_host: bool,
}

impl Route {
    pub fn new(prefix: impl Into<String>, group: GroupId, timeout: Duration) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            strip_prefix: false,
            group,
            timeout,
            preserve_host: false,
        }
    }

    pub fn with_strip_prefix(mut self, strip: bool) -> Self {
        self.strip_prefix = strip;
        self
    }

    pub fn with_preserve_host(mut self, preserve: bool) -> Self {
        self.preserve_host = preserve;
        self
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Rejected route table input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("route #{index}: duplicate route prefix {prefix:?}")]
pub struct DuplicatePrefix {
    /// Position of the repeated route in registration order.
    pub index: usize,
    pub prefix: String,
}

/// Immutable longest-prefix route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Compile routes given in registration order.
    pub fn new(routes: Vec<Route>) -> Result<Self, DuplicatePrefix> {
        let mut compiled: Vec<Arc<Route>> = Vec::with_capacity(routes.len());
        for (index, route) in routes.into_iter().enumerate() {
            if compiled.iter().any(|r| r.prefix() == route.prefix()) {
                return Err(DuplicatePrefix {
                    index,
                    prefix: route.prefix().to_string(),
                });
            }
            compiled.push(Arc::new(route));
        }

        // Longest first; stable so earlier registrations win ties.
        compiled.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));
        Ok(Self { routes: compiled })
    }

    /// Find the route with the longest prefix matching `path`.
    pub fn match_path(&self, path: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }
}
