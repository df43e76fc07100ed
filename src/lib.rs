//! Config-driven routing and credential authorization for the caaspay API.
//!
//! Routes, credentials and environment settings are read from three YAML
//! files into an immutable, versioned [`Snapshot`]. Requests are matched and
//! authorized against whichever snapshot is current when they arrive; reloads
//! publish a new snapshot atomically.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod snapshot;

pub use config::{ConfigError, ConfigSources, ConfigStore, EnvConfig, EnvOverrides, Mode};
pub use http::{Handler, HandlerContext, HandlerRegistry, HandlerResult, HttpServer};
pub use lifecycle::{ReloadCoordinator, Shutdown};
pub use routing::{RouteConflict, RouteTable, Router};
pub use security::{CallerIdentity, CredentialRegistry, Denied};
pub use snapshot::{Snapshot, SnapshotError};
