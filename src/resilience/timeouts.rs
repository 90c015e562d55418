//! Timeout enforcement.
//!
//! # Responsibilities
//! - One deadline per forwarded request, started at admission
//! - Cover connect, response head and the full body transfer
//! - Cancel operations cleanly on expiry (dropping the upstream future)
//!
//! # Design Decisions
//! - Uses Tokio's timer facilities
//! - Timeout errors are distinct from other errors
//! - Expiry before the response head returns 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

use crate::error::GatewayError;

/// Absolute deadline for one forwarded request.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start the clock now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Error reported when this deadline expires.
    pub fn expired_error(&self) -> GatewayError {
        GatewayError::UpstreamTimeout {
            timeout_ms: self.budget.as_millis() as u64,
        }
    }

    /// Timer that fires at the deadline, for use inside body streams.
    pub fn sleep(&self) -> Sleep {
        tokio::time::sleep_until(self.at)
    }

    /// Run `fut` until the deadline; the future is dropped on expiry.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, GatewayError> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| self.expired_error())
    }
}
