//! Snapshot construction from configuration sources.

use std::sync::Arc;

use crate::config::loader::{load_config, ConfigSources};
use crate::config::overrides::EnvOverrides;
use crate::http::handler::HandlerRegistry;
use crate::snapshot::{Snapshot, SnapshotError};

/// Turns configuration sources into snapshots.
///
/// Holds the inputs that stay fixed for the life of the process: the
/// environment overrides captured at startup and the handler registry.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    overrides: EnvOverrides,
    handlers: Arc<HandlerRegistry>,
}

impl ConfigStore {
    pub fn new(overrides: EnvOverrides, handlers: HandlerRegistry) -> Self {
        Self {
            overrides,
            handlers: Arc::new(handlers),
        }
    }

    /// Parse, validate and compile `sources` into a snapshot tagged `version`.
    ///
    /// All-or-nothing: any invalid source fails the whole load.
    pub fn load(&self, sources: &ConfigSources, version: u64) -> Result<Snapshot, SnapshotError> {
        let loaded = load_config(sources, &self.overrides)?;
        Snapshot::build(loaded, &self.handlers, version)
    }

    pub fn overrides(&self) -> &EnvOverrides {
        &self.overrides
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }
}
