//! Operator endpoints, served on their own listener.
//!
//! ```text
//! GET  /admin/status   snapshot version, mode, counts
//! GET  /admin/routes   compiled route listing
//! POST /admin/reload   re-read the config directory
//! ```

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::reload::ReloadCoordinator;
use crate::lifecycle::shutdown;

pub fn setup_admin_router(coordinator: Arc<ReloadCoordinator>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&coordinator),
            admin_auth_middleware,
        ))
        .with_state(coordinator)
}

/// Serve the admin router on `addr` until `shutdown` fires.
pub async fn serve_admin(
    coordinator: Arc<ReloadCoordinator>,
    addr: SocketAddr,
    shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Admin listener started");
    axum::serve(listener, setup_admin_router(coordinator))
        .with_graceful_shutdown(shutdown::wait_for(shutdown))
        .await
}
