//! Forwarding-outcome records.
//!
//! The forwarding engine emits exactly one [`ForwardOutcome`] per forwarded
//! request. Emission goes through [`OutcomeSink`], which must never block:
//! the default [`ChannelSink`] drops records when its buffer is full rather
//! than stall request handling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::sync::mpsc;

use crate::observability::metrics;

/// Result of one forward, produced when the exchange is over.
#[derive(Debug, Clone, Serialize)]
pub struct ForwardOutcome {
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
    /// Prefix of the matched route.
    pub route: String,
    /// Upstream that served the final attempt, if one was selected.
    pub upstream: Option<String>,
    /// Status relayed to the client, if a response head was received.
    pub status: Option<u16>,
    /// Error tag when the exchange failed.
    pub error: Option<&'static str>,
    #[serde(rename = "latency_ms", serialize_with = "millis")]
    pub latency: Duration,
    /// Response body bytes relayed to the client.
    pub bytes: u64,
    pub attempts: u32,
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Append-only, non-blocking consumer of outcome records.
pub trait OutcomeSink: Send + Sync + 'static {
    fn emit(&self, outcome: ForwardOutcome);
}

/// Sink backed by a bounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<ForwardOutcome>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver a consumer should drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ForwardOutcome>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Number of records discarded because the buffer was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl OutcomeSink for ChannelSink {
    fn emit(&self, outcome: ForwardOutcome) {
        if self.tx.try_send(outcome).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_outcome_dropped();
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn emit(&self, _outcome: ForwardOutcome) {}
}

/// Drain outcome records into logs and metrics until every sender is gone.
pub async fn log_outcomes(mut rx: mpsc::Receiver<ForwardOutcome>) {
    while let Some(outcome) = rx.recv().await {
        metrics::record_outcome(&outcome);
        match outcome.error {
            None => tracing::info!(
                request_id = outcome.request_id.as_deref().unwrap_or("-"),
                method = %outcome.method,
                path = %outcome.path,
                route = %outcome.route,
                upstream = outcome.upstream.as_deref().unwrap_or("-"),
                status = outcome.status.unwrap_or(0),
                latency_ms = outcome.latency.as_millis() as u64,
                bytes = outcome.bytes,
                attempts = outcome.attempts,
                "Request forwarded"
            ),
            Some(error) => tracing::warn!(
                request_id = outcome.request_id.as_deref().unwrap_or("-"),
                method = %outcome.method,
                path = %outcome.path,
                route = %outcome.route,
                upstream = outcome.upstream.as_deref().unwrap_or("-"),
                status = outcome.status.unwrap_or(0),
                error,
                latency_ms = outcome.latency.as_millis() as u64,
                bytes = outcome.bytes,
                attempts = outcome.attempts,
                "Request failed"
            ),
        }
    }
}
