//! caaspay API server.
//!
//! ```text
//!                   ┌──────────────────────────────────────────────┐
//!  Client request   │  axum + tower-http (request id, trace, limit) │
//!  ────────────────▶│          │                                    │
//!                   │          ▼                                    │
//!                   │   Router ──load_full──▶ Arc<Snapshot vN>      │
//!                   │     │  RouteTable → CredentialRegistry        │
//!                   │     ▼                                         │
//!                   │   named handler (timeout, cancellation)       │
//!                   └──────────────────────────────────────────────┘
//!                               ▲ atomic publish
//!   api.yaml / routes.yaml /    │
//!   credentials.yaml ──▶ ReloadCoordinator ◀── watcher / SIGHUP / admin
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use caaspay_api::config::watcher::ConfigWatcher;
use caaspay_api::config::EnvOverrides;
use caaspay_api::http::builtin;
use caaspay_api::lifecycle::{reload, signals, startup, Shutdown};
use caaspay_api::observability::{logging, metrics};
use caaspay_api::{admin, HandlerRegistry, HttpServer};

#[derive(Parser)]
#[command(name = "caaspay-api")]
#[command(about = "Config-driven routing and credential authorization", long_about = None)]
struct Cli {
    /// Directory holding api.yaml, routes.yaml and credentials.yaml
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = EnvOverrides::from_env()?;
    let mut handlers = HandlerRegistry::new();
    builtin::register(&mut handlers);

    let coordinator = match startup::bootstrap(&cli.config_dir, overrides, handlers) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            logging::init_logging(overrides.mode.unwrap_or(caaspay_api::Mode::Debug), "info");
            tracing::error!(error = %e, config_dir = ?cli.config_dir, "Configuration rejected");
            return Err(e.into());
        }
    };

    let snapshot = coordinator.current();
    let env = snapshot.env();
    logging::init_logging(env.mode, &env.log_level);
    startup::announce(&snapshot);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %env.mode,
        routes = snapshot.routes().len(),
        credentials = snapshot.credentials().len(),
        "caaspay-api starting"
    );

    if cli.check {
        println!(
            "configuration OK: {} routes, {} credentials, mode {}",
            snapshot.routes().len(),
            snapshot.credentials().len(),
            env.mode
        );
        return Ok(());
    }

    if env.metrics.enabled {
        match env.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => {
                metrics::init_metrics()?;
                metrics::record_snapshot_version(snapshot.version());
                tokio::spawn(async move {
                    if let Err(e) = metrics::serve_metrics(addr).await {
                        tracing::error!(error = %e, "Metrics listener failed");
                    }
                });
            }
            Err(e) => tracing::error!(
                metrics_address = %env.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();

    tokio::spawn(reload::run_reload_loop(
        coordinator.clone(),
        reload_rx,
        shutdown.subscribe(),
    ));
    tokio::spawn(signals::listen(shutdown.clone(), reload_tx.clone()));

    // Dropping the watcher stops it, so keep it for the life of main.
    let _watcher = match ConfigWatcher::new(&cli.config_dir, reload_tx).run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, reload via SIGHUP or admin only");
            None
        }
    };

    if env.admin.enabled {
        let addr: SocketAddr = env.admin.bind_address.parse()?;
        let admin_coordinator = coordinator.clone();
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = admin::serve_admin(admin_coordinator, addr, admin_shutdown).await {
                tracing::error!(error = %e, "Admin listener failed");
            }
        });
    }

    let listener = TcpListener::bind(env.socket_addr()?).await?;
    let server_shutdown = shutdown.subscribe();
    drop(snapshot);

    HttpServer::new(coordinator).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
