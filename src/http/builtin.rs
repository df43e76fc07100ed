//! Handlers shipped with the binary.
//!
//! `health` and `echo` let a configuration be exercised end to end before any
//! domain handlers exist.

use axum::body::Body;
use axum::http::Request;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::http::handler::{HandlerContext, HandlerRegistry, HandlerResult};
use crate::routing::PathParams;
use crate::security::credentials::CallerIdentity;

pub const HEALTH: &str = "health";
pub const ECHO: &str = "echo";

/// Register the built-in handlers under their well-known names.
pub fn register(registry: &mut HandlerRegistry) -> &mut HandlerRegistry {
    registry.register(HEALTH, health).register(ECHO, echo)
}

/// `{"status": "ok", "version": N, "mode": "debug"}`
pub async fn health(
    ctx: HandlerContext,
    _request: Request<Body>,
    _params: PathParams,
    _caller: CallerIdentity,
) -> HandlerResult {
    Ok(Json(json!({
        "status": "ok",
        "version": ctx.snapshot_version(),
        "mode": ctx.mode(),
    }))
    .into_response())
}

/// Reflects what the router resolved for the request.
pub async fn echo(
    ctx: HandlerContext,
    request: Request<Body>,
    params: PathParams,
    caller: CallerIdentity,
) -> HandlerResult {
    Ok(Json(json!({
        "method": request.method().as_str(),
        "route": ctx.route(),
        "params": params,
        "caller": caller.id(),
        "request_id": ctx.request_id(),
        "version": ctx.snapshot_version(),
    }))
    .into_response())
}
