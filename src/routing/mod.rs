//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (longest-prefix lookup)
//!     → matcher.rs (segment-aware prefix test)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at load and on reload):
//!     RouteConfig[]
//!     → Sort by prefix length (stable)
//!     → Freeze as immutable RouteTable inside a Snapshot
//! ```
//!
//! # Design Decisions
//! - Routes compiled per generation, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{rewrite_path, PathPrefixMatcher};
pub use router::{Route, RouteTable};
