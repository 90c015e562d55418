//! HTTP front-end.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve, peer address recorded)
//!     → request id layer (x-request-id, UUID v4)
//!     → trace layer (one span per request)
//!     → server.rs fallback handler
//!         → request.rs (ForwardContext)
//!         → Gateway (route match → forwarding engine)
//!         → response.rs (GatewayError → status + JSON)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::GatewayServer;
