//! Startup orchestration.
//!
//! Configuration first, then the snapshot, then listeners. Any error before
//! the listeners start is fatal.

use std::path::Path;
use std::sync::Arc;

use crate::config::overrides::EnvOverrides;
use crate::config::store::ConfigStore;
use crate::http::handler::HandlerRegistry;
use crate::lifecycle::reload::ReloadCoordinator;
use crate::snapshot::{Snapshot, SnapshotError};

/// Load `dir` into the first snapshot.
///
/// Environment overrides are captured by the caller once and reused for
/// every later reload.
pub fn bootstrap(
    dir: &Path,
    overrides: EnvOverrides,
    handlers: HandlerRegistry,
) -> Result<Arc<ReloadCoordinator>, SnapshotError> {
    let store = ConfigStore::new(overrides, handlers);
    ReloadCoordinator::bootstrap_from_dir(store, dir).map(Arc::new)
}

/// Report the initial snapshot. Call once logging is installed.
pub fn announce(snapshot: &Snapshot) {
    tracing::info!(
        version = snapshot.version(),
        mode = %snapshot.env().mode,
        routes = snapshot.routes().len(),
        credentials = snapshot.credentials().len(),
        "Initial configuration snapshot published"
    );
}
