//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (per snapshot):
//!     RouteDefinition[] (from routes.yaml)
//!     → pattern.rs (parse `:param` patterns)
//!     → table.rs (per-method tries, conflict detection)
//!     → Freeze as immutable RouteTable inside the Snapshot
//!
//! Incoming Request (method, path, headers)
//!     → router.rs (load current snapshot)
//!     → table.rs lookup (match, 405, or 404)
//!     → credential enforcement
//!     → bound handler under a deadline
//! ```
//!
//! # Design Decisions
//! - Tables are compiled off to the side and never mutated after publish
//! - Literal segments outrank parameters; same-shape patterns are rejected
//! - No regex in the hot path

use axum::http::Method;

pub mod matcher;
pub mod pattern;
pub mod router;
pub mod table;

pub use pattern::{PathPattern, PatternError};
pub use router::Router;
pub use table::{PathParams, RouteConflict, RouteDefinition, RouteLookup, RouteMatch, RouteTable};

/// Methods accepted in `routes.yaml`, in `Allow` header order.
pub const KNOWN_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Parse a method name from configuration (case-insensitive).
pub fn parse_method(name: &str) -> Option<Method> {
    let upper = name.trim().to_ascii_uppercase();
    KNOWN_METHODS.into_iter().find(|m| m.as_str() == upper)
}
