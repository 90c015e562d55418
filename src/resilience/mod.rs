//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline started at admission, covers the body)
//!     → On transport failure: retries.rs (one retry, other upstream)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream exchange has a deadline
//! - No retry against a known-empty pool
//! - No retry once response bytes have reached the client

pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::Deadline;
