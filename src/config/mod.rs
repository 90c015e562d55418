//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into a Snapshot (route table + upstream pool)
//!
//! On reload (SIGHUP or watcher.rs):
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new Snapshot built, then atomically swapped in
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GatewayConfig, HealthCheckConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProbeConfig, RetryConfig, RouteConfig, TimeoutConfig,
};
