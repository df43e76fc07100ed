//! Snapshot publication and hot reload.
//!
//! The active [`Snapshot`] lives behind an `ArcSwap`. Requests take a full
//! `Arc` with `load_full` and keep it for their whole lifetime, so a publish
//! never waits for readers and readers never wait for a publish. Reloads are
//! serialized among themselves by a mutex no request path touches.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::ConfigSources;
use crate::config::schema::EnvConfig;
use crate::config::store::ConfigStore;
use crate::observability::metrics;
use crate::snapshot::{Snapshot, SnapshotError};

/// Quiet period after the last trigger before a reload runs.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// A successfully published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub version: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReloadError {
    /// The new sources were rejected; the previous snapshot stays active.
    #[error(transparent)]
    Rejected(#[from] SnapshotError),

    #[error("no configuration directory to reload from")]
    NoSourceDirectory,
}

/// What asked for a reload. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    FileChange,
    Signal,
    Admin,
}

impl ReloadTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadTrigger::FileChange => "file_change",
            ReloadTrigger::Signal => "signal",
            ReloadTrigger::Admin => "admin",
        }
    }
}

pub struct ReloadCoordinator {
    current: Arc<ArcSwap<Snapshot>>,
    store: ConfigStore,
    config_dir: Option<PathBuf>,
    reload_lock: Mutex<()>,
}

impl ReloadCoordinator {
    /// Build the initial snapshot (version 1) and publish it.
    ///
    /// Nothing is logged here: the subscriber is configured from this
    /// snapshot, so the caller reports it with [`crate::lifecycle::startup::announce`].
    pub fn bootstrap(store: ConfigStore, sources: &ConfigSources) -> Result<Self, SnapshotError> {
        let snapshot = store.load(sources, 1)?;
        metrics::record_snapshot_version(1);
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(snapshot)),
            store,
            config_dir: None,
            reload_lock: Mutex::new(()),
        })
    }

    /// Like [`ReloadCoordinator::bootstrap`], reading the three files from
    /// `dir`. Later calls to [`ReloadCoordinator::reload_from_disk`] read the
    /// same directory.
    pub fn bootstrap_from_dir(store: ConfigStore, dir: &Path) -> Result<Self, SnapshotError> {
        let sources = ConfigSources::from_dir(dir)?;
        let mut coordinator = Self::bootstrap(store, &sources)?;
        coordinator.config_dir = Some(dir.to_path_buf());
        Ok(coordinator)
    }

    /// The snapshot new requests are matched against.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Shared handle to the published snapshot, for the router.
    pub fn snapshots(&self) -> Arc<ArcSwap<Snapshot>> {
        Arc::clone(&self.current)
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Build a snapshot from `sources` off to the side and publish it only if
    /// it is entirely valid. A failed reload consumes no version number.
    pub fn reload(&self, sources: &ConfigSources) -> Result<Applied, ReloadError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = self.current.load_full();
        let version = previous.version() + 1;

        let next = match self.store.load(sources, version) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                metrics::record_reload("rejected");
                tracing::error!(
                    error = %e,
                    active_version = previous.version(),
                    "Reload rejected, keeping current configuration"
                );
                return Err(e.into());
            }
        };

        log_restart_required(previous.env(), next.env());
        tracing::info!(
            version,
            previous_version = previous.version(),
            mode = %next.env().mode,
            routes = next.routes().len(),
            credentials = next.credentials().len(),
            "Configuration snapshot published"
        );

        self.current.store(Arc::new(next));
        metrics::record_reload("applied");
        metrics::record_snapshot_version(version);
        Ok(Applied { version })
    }

    /// Re-read the configuration directory and reload from it.
    pub fn reload_from_disk(&self) -> Result<Applied, ReloadError> {
        let dir = self.config_dir.as_deref().ok_or(ReloadError::NoSourceDirectory)?;
        let sources = match ConfigSources::from_dir(dir) {
            Ok(sources) => sources,
            Err(e) => {
                metrics::record_reload("rejected");
                tracing::error!(error = %e, "Reload rejected, keeping current configuration");
                return Err(SnapshotError::from(e).into());
            }
        };
        self.reload(&sources)
    }
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("version", &self.current.load().version())
            .field("config_dir", &self.config_dir)
            .finish()
    }
}

/// Settings bound at startup stay in effect until the process restarts.
fn log_restart_required(old: &EnvConfig, new: &EnvConfig) {
    let mut changed = Vec::new();
    if old.host != new.host {
        changed.push("host");
    }
    if old.port != new.port {
        changed.push("port");
    }
    if old.max_body_bytes != new.max_body_bytes {
        changed.push("max_body_bytes");
    }
    if old.admin != new.admin {
        changed.push("admin");
    }
    if old.metrics != new.metrics {
        changed.push("metrics");
    }
    if old.log_level != new.log_level {
        changed.push("log_level");
    }
    if !changed.is_empty() {
        tracing::warn!(
            fields = ?changed,
            "Changed settings take effect only after a restart"
        );
    }
}

/// Apply reload triggers until shutdown.
///
/// Triggers arriving within [`DEBOUNCE`] of each other collapse into one
/// reload; editors often emit several events for a single save.
pub async fn run_reload_loop(
    coordinator: Arc<ReloadCoordinator>,
    mut triggers: mpsc::UnboundedReceiver<ReloadTrigger>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let trigger = tokio::select! {
            _ = shutdown.recv() => break,
            trigger = triggers.recv() => match trigger {
                Some(trigger) => trigger,
                None => break,
            },
        };

        loop {
            match tokio::time::timeout(DEBOUNCE, triggers.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }

        tracing::info!(trigger = trigger.as_str(), "Reloading configuration");
        let worker = Arc::clone(&coordinator);
        match tokio::task::spawn_blocking(move || worker.reload_from_disk()).await {
            Ok(Ok(applied)) => {
                tracing::debug!(version = applied.version, "Reload applied");
            }
            Ok(Err(_)) => {}
            Err(e) => tracing::error!(error = %e, "Reload task failed"),
        }
    }
    tracing::debug!("Reload loop stopped");
}
