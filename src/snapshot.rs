//! Versioned configuration snapshots.
//!
//! A snapshot bundles everything a request needs: the compiled route table,
//! the handlers bound to it, the credential index and the environment. It is
//! immutable; configuration changes produce a new snapshot.

use std::sync::Arc;
use std::time::SystemTime;

use crate::config::loader::{ConfigError, ConfigErrorKind, ConfigFile, LoadedConfig};
use crate::config::schema::EnvConfig;
use crate::http::handler::{BoxedHandler, HandlerRegistry};
use crate::routing::{RouteConflict, RouteTable};
use crate::security::credentials::CredentialRegistry;

/// Why a snapshot could not be built.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Conflict(#[from] RouteConflict),
}

pub struct Snapshot {
    version: u64,
    env: EnvConfig,
    routes: RouteTable,
    // Indexed like `routes.routes()`.
    handlers: Vec<BoxedHandler>,
    credentials: CredentialRegistry,
    loaded_at: SystemTime,
}

impl Snapshot {
    /// Bind handlers, compile routes and index credentials.
    pub fn build(
        loaded: LoadedConfig,
        registry: &HandlerRegistry,
        version: u64,
    ) -> Result<Self, SnapshotError> {
        let mut handlers = Vec::with_capacity(loaded.routes.len());
        for route in &loaded.routes {
            let handler = registry.get(&route.handler).ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorKind::UnknownHandler,
                    ConfigFile::Routes,
                    format!(
                        "{} {} refers to unregistered handler {:?}",
                        route.method, route.pattern, route.handler
                    ),
                )
            })?;
            handlers.push(Arc::clone(handler));
        }

        let routes = RouteTable::compile(loaded.routes)?;
        let credentials = CredentialRegistry::from_records(loaded.credentials).map_err(|e| {
            ConfigError::new(
                ConfigErrorKind::DuplicateCredential,
                ConfigFile::Credentials,
                e.to_string(),
            )
        })?;

        Ok(Self {
            version,
            env: loaded.env,
            routes,
            handlers,
            credentials,
            loaded_at: SystemTime::now(),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn env(&self) -> &EnvConfig {
        &self.env
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn credentials(&self) -> &CredentialRegistry {
        &self.credentials
    }

    /// Handler bound to the route at `index` of [`Snapshot::routes`].
    pub fn handler(&self, index: usize) -> Option<&BoxedHandler> {
        self.handlers.get(index)
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("mode", &self.env.mode)
            .field("routes", &self.routes.len())
            .field("credentials", &self.credentials.len())
            .finish()
    }
}
