//! Upstream pool management.
//!
//! # Responsibilities
//! - Own the upstream groups of one configuration generation
//! - Apply round-robin selection among healthy members
//! - Hand out leases that account for active connections

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::uri::InvalidUri;

use crate::error::GatewayError;
use crate::load_balancer::{
    round_robin::RoundRobin,
    upstream::{Upstream, UpstreamLease},
};

/// Identifier of an upstream group within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// An ordered set of upstreams serving one route.
#[derive(Debug)]
pub struct UpstreamGroup {
    id: GroupId,
    members: Vec<Arc<Upstream>>,
    balancer: RoundRobin,
}

impl UpstreamGroup {
    pub fn new(id: GroupId, members: Vec<Arc<Upstream>>) -> Self {
        Self {
            id,
            members,
            balancer: RoundRobin::new(),
        }
    }

    /// Build a group from `host:port` addresses.
    pub fn from_addresses<S: AsRef<str>>(id: GroupId, addresses: &[S]) -> Result<Self, InvalidUri> {
        let members = addresses
            .iter()
            .map(|a| Upstream::new(a.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(id, members))
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn members(&self) -> &[Arc<Upstream>] {
        &self.members
    }

    /// Select a healthy upstream round-robin.
    /// The returned lease must be held for the whole forward.
    pub fn select(&self) -> Result<UpstreamLease, GatewayError> {
        self.pick(None)
    }

    /// Select a healthy upstream other than `exclude`.
    pub fn select_excluding(&self, exclude: &Arc<Upstream>) -> Result<UpstreamLease, GatewayError> {
        self.pick(Some(exclude))
    }

    fn pick(&self, exclude: Option<&Arc<Upstream>>) -> Result<UpstreamLease, GatewayError> {
        match self.balancer.next(&self.members, exclude) {
            Some(upstream) => Ok(UpstreamLease::acquire(upstream)),
            None => {
                tracing::debug!(
                    group = %self.id,
                    member_count = self.members.len(),
                    "No healthy upstream found in group"
                );
                Err(GatewayError::NoHealthyUpstream { group: self.id })
            }
        }
    }
}

/// All upstream groups of one configuration generation.
#[derive(Debug, Default)]
pub struct UpstreamPool {
    groups: Vec<Arc<UpstreamGroup>>,
}

impl UpstreamPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group built from addresses; returns its id.
    pub fn add_group<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<GroupId, InvalidUri> {
        let id = GroupId(self.groups.len());
        self.groups
            .push(Arc::new(UpstreamGroup::from_addresses(id, addresses)?));
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Arc<UpstreamGroup>> {
        self.groups.get(id.0)
    }

    pub fn groups(&self) -> &[Arc<UpstreamGroup>] {
        &self.groups
    }

    /// Carry health state over from `previous` for every address both
    /// generations share. New addresses keep their fresh, healthy state.
    pub fn inherit_health(&self, previous: &UpstreamPool) {
        let known: HashMap<&str, &Arc<Upstream>> = previous
            .groups
            .iter()
            .flat_map(|g| g.members().iter())
            .map(|u| (u.address(), u))
            .collect();
        for upstream in self.groups.iter().flat_map(|g| g.members().iter()) {
            if let Some(old) = known.get(upstream.address()) {
                upstream.inherit_health(old);
            }
        }
    }

    /// Return every upstream (for health checking).
    pub fn all_upstreams(&self) -> Vec<Arc<Upstream>> {
        self.groups
            .iter()
            .flat_map(|g| g.members().iter())
            .cloned()
            .collect()
    }
}
