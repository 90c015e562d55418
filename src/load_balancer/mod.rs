//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → upstream group identified
//!     → pool.rs (group of the current snapshot)
//!     → round_robin.rs (rotate through healthy members)
//!     → upstream.rs (lease: connection accounting)
//!     → Return lease or NoHealthyUpstream
//! ```
//!
//! # Design Decisions
//! - Selection is an atomic cursor advance, never a lock held across I/O
//! - Unhealthy upstreams excluded from selection
//! - Groups belong to one configuration generation and are never mutated;
//!   a reload builds new groups

pub mod pool;
pub mod round_robin;
pub mod upstream;

pub use pool::{GroupId, UpstreamGroup, UpstreamPool};
pub use upstream::{Upstream, UpstreamLease};
