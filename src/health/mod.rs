//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Per-upstream jittered timer
//!     → probe.rs (TCP connect or HTTP HEAD, bounded timeout)
//!     → Upstream::mark_success / mark_failure
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Probes never run on the request path; results travel through atomics
//! - State transitions require consecutive results
//! - Health state is per-upstream, not per-group
//! - Probe loops belong to one snapshot generation and stop with it

pub mod active;
pub mod probe;
pub mod state;

pub use active::{HealthMonitor, MonitorHandle};
pub use probe::{HttpHeadProbe, Probe, ProbeError, TcpProbe};
pub use state::{HealthThresholds, HealthTransition};
