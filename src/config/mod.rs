//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! api.yaml + routes.yaml + credentials.yaml
//!     → loader.rs (read & deserialize into Raw* schema types)
//!     → validation.rs (semantic checks, env overrides)
//!     → store.rs (bind handlers, compile routes, index credentials)
//!     → Snapshot (validated, immutable)
//!
//! On reload signal:
//!     watcher.rs detects change (or SIGHUP / admin endpoint)
//!     → lifecycle::reload builds a new Snapshot off to the side
//!     → atomic swap of Arc<Snapshot>
//!     → new requests observe the new snapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once built; changes require a full reload
//! - Loading is all-or-nothing across the three files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigErrorKind, ConfigFile, ConfigSources, LoadedConfig};
pub use overrides::EnvOverrides;
pub use schema::{AdminConfig, EnvConfig, MetricsConfig, Mode};
pub use store::ConfigStore;
