//! OS signal handling.
//!
//! SIGINT and SIGTERM start a graceful shutdown. SIGHUP asks for a
//! configuration reload and never stops the process.

use tokio::sync::mpsc;

use crate::lifecycle::reload::ReloadTrigger;
use crate::lifecycle::shutdown::Shutdown;

/// Listen for process signals until shutdown has been triggered.
pub async fn listen(shutdown: Shutdown, reloads: mpsc::UnboundedSender<ReloadTrigger>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
                ctrl_c_then(shutdown).await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(signal = "SIGINT", "Shutdown signal received");
                    break;
                }
                _ = term.recv() => {
                    tracing::info!(signal = "SIGTERM", "Shutdown signal received");
                    break;
                }
                _ = hup.recv() => {
                    tracing::info!(signal = "SIGHUP", "Reload signal received");
                    if reloads.send(ReloadTrigger::Signal).is_err() {
                        tracing::warn!("Reload loop is not running, SIGHUP ignored");
                    }
                }
            }
        }
        shutdown.trigger();
    }

    #[cfg(not(unix))]
    {
        let _ = reloads;
        ctrl_c_then(shutdown).await;
    }
}

async fn ctrl_c_then(shutdown: Shutdown) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!(signal = "SIGINT", "Shutdown signal received");
    shutdown.trigger();
}
