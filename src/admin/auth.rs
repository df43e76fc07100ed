use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::response::ErrorBody;
use crate::lifecycle::reload::ReloadCoordinator;
use crate::security::secret::constant_time_eq;

/// Bearer check against the admin key of the current snapshot, so a rotated
/// key takes effect on the next reload.
pub async fn admin_auth_middleware(
    State(coordinator): State<Arc<ReloadCoordinator>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = coordinator.current();
    let expected = snapshot.env().admin.api_key.as_bytes();

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::as_bytes);

    match presented {
        Some(token) if !expected.is_empty() && constant_time_eq(token, expected) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!(path = %request.uri().path(), "Admin request rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("unauthorized", StatusCode::UNAUTHORIZED)),
            )
                .into_response()
        }
    }
}
