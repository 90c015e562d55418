//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request (RouteMatch + ForwardContext)
//!     → engine.rs (select upstream, rewrite, deadline, one retry)
//!     → headers.rs (hop-by-hop stripping, X-Forwarded-*, Host)
//!     → body.rs (lazy request body, deadline-bounded response relay)
//!     → in_flight.rs (lease held to the last byte, one outcome record)
//! ```
//!
//! # Design Decisions
//! - Bodies stream in both directions; nothing is buffered whole
//! - The upstream lease lives inside the response body
//! - Errors before the response head become status codes; errors after it
//!   abort the client stream

pub mod body;
pub mod engine;
pub mod headers;
pub mod in_flight;

pub use engine::{EngineSettings, ForwardContext, ForwardingEngine};
pub use in_flight::InFlightRequest;
