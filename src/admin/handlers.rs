use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::http::response::ErrorBody;
use crate::lifecycle::reload::{ReloadCoordinator, ReloadError};
use crate::security::capability::Capability;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: u64,
    pub mode: String,
    pub routes: usize,
    pub credentials: usize,
    pub active_credentials: usize,
    /// Unix seconds.
    pub loaded_at: u64,
    pub build: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub handler: String,
    pub capabilities: Vec<Capability>,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub version: u64,
}

pub async fn get_status(State(coordinator): State<Arc<ReloadCoordinator>>) -> Json<SystemStatus> {
    let snapshot = coordinator.current();
    let loaded_at = snapshot
        .loaded_at()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Json(SystemStatus {
        version: snapshot.version(),
        mode: snapshot.env().mode.to_string(),
        routes: snapshot.routes().len(),
        credentials: snapshot.credentials().len(),
        active_credentials: snapshot.credentials().active_count(),
        loaded_at,
        build: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_routes(State(coordinator): State<Arc<ReloadCoordinator>>) -> Json<Vec<RouteInfo>> {
    let snapshot = coordinator.current();
    let routes = snapshot
        .routes()
        .routes()
        .iter()
        .map(|r| RouteInfo {
            method: r.method.to_string(),
            path: r.pattern.to_string(),
            handler: r.handler.clone(),
            capabilities: r.required_capabilities.iter().cloned().collect(),
            public: r.public,
            timeout_ms: r.timeout.map(|t| t.as_millis() as u64),
        })
        .collect();
    Json(routes)
}

/// Re-read the config directory. `422` leaves the active snapshot in place.
pub async fn post_reload(State(coordinator): State<Arc<ReloadCoordinator>>) -> impl IntoResponse {
    tracing::info!(trigger = "admin", "Reloading configuration");
    let worker = Arc::clone(&coordinator);
    let outcome = tokio::task::spawn_blocking(move || worker.reload_from_disk()).await;

    match outcome {
        Ok(Ok(applied)) => (
            StatusCode::OK,
            Json(ReloadResponse {
                version: applied.version,
            }),
        )
            .into_response(),
        Ok(Err(e @ ReloadError::Rejected(_))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody::new(e.to_string(), StatusCode::UNPROCESSABLE_ENTITY)),
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::CONFLICT,
            Json(ErrorBody::new(e.to_string(), StatusCode::CONFLICT)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Reload task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(
                    "reload task failed",
                    StatusCode::INTERNAL_SERVER_ERROR,
                )),
            )
                .into_response()
        }
    }
}
