//! OS signal handling.
//!
//! SIGTERM, SIGINT and Ctrl-C request shutdown; SIGHUP requests a config
//! reload. Off unix only Ctrl-C is available.

/// What a received signal asks the process to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Shutdown,
    Reload,
}

#[cfg(unix)]
pub struct SignalListener {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal.
    pub async fn next(&mut self) -> SignalEvent {
        tokio::select! {
            _ = self.terminate.recv() => {
                tracing::info!(signal = "SIGTERM", "Shutdown signal received");
                SignalEvent::Shutdown
            }
            _ = self.interrupt.recv() => {
                tracing::info!(signal = "SIGINT", "Shutdown signal received");
                SignalEvent::Shutdown
            }
            _ = self.hangup.recv() => {
                tracing::info!(signal = "SIGHUP", "Reload signal received");
                SignalEvent::Reload
            }
        }
    }
}

#[cfg(not(unix))]
pub struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn next(&mut self) -> SignalEvent {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        } else {
            tracing::info!("Shutdown signal received");
        }
        SignalEvent::Shutdown
    }
}
