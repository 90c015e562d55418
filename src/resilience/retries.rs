//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt may be retried
//! - Allow exactly one retry, against a different upstream
//!
//! # Design Decisions
//! - Only transport failures before the response head are retryable
//! - Timeouts are terminal: the deadline covers the whole request
//! - A retry needs a request body that was never handed to the wire

use crate::error::GatewayError;

/// Attempts per request when retries are enabled.
pub const MAX_ATTEMPTS: u32 = 2;

/// Retry decision for a forwarded request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether attempt number `attempt` (1-based) that failed with `error`
    /// may be followed by another.
    pub fn should_retry(&self, attempt: u32, error: &GatewayError, body_replayable: bool) -> bool {
        self.enabled && attempt < MAX_ATTEMPTS && error.is_transport_failure() && body_replayable
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
