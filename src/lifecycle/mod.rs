//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/Ctrl-C → SignalEvent::Shutdown
//!     SIGHUP → SignalEvent::Reload
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain
//!     → forced exit once the grace period is over
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{SignalEvent, SignalListener};
