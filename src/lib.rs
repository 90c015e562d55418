//! Path-prefix HTTP gateway.
//!
//! Requests are matched against an ordered table of path prefixes and
//! forwarded to a group of upstream servers, round-robin over the members a
//! background health monitor currently considers healthy.
//!
//! ```text
//!   client ─▶ http (axum front-end, request id, tracing)
//!               │
//!               ▼
//!            Gateway ── ArcSwap<Snapshot> ── routing (RouteTable)
//!               │                         └─ load_balancer (UpstreamPool)
//!               ▼                                 ▲
//!            forward (engine, headers, bodies)    │ atomics
//!               │                                 │
//!               ▼                              health (probe loops)
//!            upstream
//!
//!   config (TOML, validation, watcher) ─▶ Gateway::apply ─▶ new Snapshot
//!   observability: outcome sink, tracing-subscriber, Prometheus
//!   lifecycle: signals, graceful shutdown
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod routing;
pub mod state;

// Traffic management
pub mod forward;
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
