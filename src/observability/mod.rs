//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding engine:
//!     → outcome.rs (one ForwardOutcome per request, non-blocking sink)
//!     → consumer task → logging (tracing) + metrics.rs
//!
//! Health monitor, reload, lifecycle:
//!     → tracing events with structured fields
//!     → metrics.rs gauges/counters
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Request ID flows from the front-end into outcome records
//! - Record emission never stalls request handling

pub mod logging;
pub mod metrics;
pub mod outcome;

pub use outcome::{ChannelSink, ForwardOutcome, NullSink, OutcomeSink};
