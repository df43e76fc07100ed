//! Configuration directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{API_FILE, CREDENTIALS_FILE, ROUTES_FILE};
use crate::lifecycle::reload::ReloadTrigger;

/// Watches the configuration directory and asks for a reload whenever one of
/// the three configuration files is written, created or replaced.
///
/// The directory is watched rather than the files so that editors which save
/// through a rename are still seen.
pub struct ConfigWatcher {
    dir: PathBuf,
    triggers: mpsc::UnboundedSender<ReloadTrigger>,
}

impl ConfigWatcher {
    pub fn new(dir: &Path, triggers: mpsc::UnboundedSender<ReloadTrigger>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            triggers,
        }
    }

    /// Start watching in notify's background thread. Dropping the returned
    /// watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.triggers;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify()
                        || event.kind.is_create()
                        || event.kind.is_remove())
                        && event.paths.iter().any(|p| is_config_file(p));
                    if relevant {
                        tracing::debug!(paths = ?event.paths, "Config file change detected");
                        let _ = tx.send(ReloadTrigger::FileChange);
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.dir, "Config watcher started");
        Ok(watcher)
    }
}

fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == API_FILE || n == ROUTES_FILE || n == CREDENTIALS_FILE)
}
