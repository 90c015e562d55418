//! Shutdown coordination.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to a broadcast channel; [`Shutdown::drain`]
/// bounds how long the process waits for them afterwards.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
    grace: Duration,
}

impl Shutdown {
    pub fn new(grace: Duration) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
            grace,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Wait for `work` to finish within the grace period.
    /// Returns `false` if the grace period ran out first.
    pub async fn drain<F: Future>(&self, work: F) -> bool {
        match tokio::time::timeout(self.grace, work).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(grace_ms = self.grace.as_millis() as u64, "Drain timed out");
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers_once() {
        let shutdown = Shutdown::default();
        let mut rx = shutdown.subscribe();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drain_bounded_by_grace() {
        let shutdown = Shutdown::new(Duration::from_millis(20));
        assert!(shutdown.drain(async {}).await);
        assert!(!shutdown.drain(tokio::time::sleep(Duration::from_secs(5))).await);
    }
}
