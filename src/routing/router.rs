//! Request dispatch against the active snapshot.
//!
//! # Responsibilities
//! - Pin the current snapshot for the lifetime of one request
//! - Resolve the route (404 / 405 / match)
//! - Enforce the route's credential requirements (401 / 403)
//! - Run the bound handler under the route's deadline (500 / 504)
//!
//! # Design Decisions
//! - Matching and authorization never await and never take a lock
//! - Handler responses are returned unchanged
//! - A timed-out or disconnected request cancels its handler and releases
//!   its snapshot without waiting for the handler to notice

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;
use tracing::Instrument;

use crate::http::handler::{cancel_pair, HandlerContext};
use crate::http::request::request_id;
use crate::http::response::{error_response, method_not_allowed};
use crate::observability::metrics;
use crate::routing::table::RouteLookup;
use crate::security::access_control::{authorize_request, denial_status};
use crate::security::credentials::CallerIdentity;
use crate::snapshot::Snapshot;

use super::PathParams;

/// Dispatches requests to the handlers of the currently published snapshot.
#[derive(Clone)]
pub struct Router {
    snapshots: Arc<ArcSwap<Snapshot>>,
}

/// Everything needed to run a handler once lookup and authorization pass.
struct Dispatch {
    index: usize,
    pattern: String,
    params: PathParams,
    timeout: Duration,
    caller: CallerIdentity,
}

/// A request answered before reaching a handler. `route` is set when a route
/// matched but authorization failed.
struct Rejected {
    route: Option<String>,
    response: Response,
}

impl Rejected {
    fn unmatched(response: Response) -> Self {
        Self {
            route: None,
            response,
        }
    }
}

impl Router {
    pub fn new(snapshots: Arc<ArcSwap<Snapshot>>) -> Self {
        Self { snapshots }
    }

    /// Handle one request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let snapshot = self.snapshots.load_full();
        let method = request.method().clone();
        let request_id = request_id(&request);

        let span = tracing::debug_span!(
            "dispatch",
            request_id = %request_id,
            method = %method,
            snapshot_version = snapshot.version(),
        );

        async move {
            let dispatch = match resolve(&snapshot, &request) {
                Ok(dispatch) => dispatch,
                Err(rejected) => {
                    metrics::record_request(
                        method.as_str(),
                        rejected.response.status().as_u16(),
                        rejected.route.as_deref().unwrap_or(metrics::UNMATCHED_ROUTE),
                        start,
                    );
                    return rejected.response;
                }
            };

            let pattern = dispatch.pattern.clone();
            let response = invoke(snapshot, request, request_id, dispatch).await;
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                &pattern,
                start,
            );
            response
        }
        .instrument(span)
        .await
    }

    /// Version of the snapshot new requests will see.
    pub fn current_version(&self) -> u64 {
        self.snapshots.load().version()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("snapshot_version", &self.current_version())
            .finish()
    }
}

/// Route lookup and authorization. Pure computation over the snapshot.
fn resolve(snapshot: &Snapshot, request: &Request<Body>) -> Result<Dispatch, Rejected> {
    let mode = snapshot.env().mode;
    let path = request.uri().path();

    let matched = match snapshot.routes().lookup(request.method(), path) {
        RouteLookup::Matched(matched) => matched,
        RouteLookup::MethodNotAllowed { allowed } => {
            tracing::debug!(path = %path, "Method not allowed");
            return Err(Rejected::unmatched(method_not_allowed(&allowed, mode)));
        }
        RouteLookup::NotFound => {
            tracing::debug!(path = %path, "No route matched");
            return Err(Rejected::unmatched(error_response(
                StatusCode::NOT_FOUND,
                Some(format!("no route for {} {}", request.method(), path)),
                mode,
            )));
        }
    };

    let route = matched.route;
    let caller = match authorize_request(snapshot.credentials(), route, request.headers()) {
        Ok(caller) => caller,
        Err(denied) => {
            metrics::record_auth_denied(denied.as_str());
            tracing::warn!(
                route = %route.pattern,
                reason = denied.as_str(),
                "Request denied"
            );
            return Err(Rejected {
                route: Some(route.pattern.to_string()),
                response: error_response(denial_status(denied), Some(denied.to_string()), mode),
            });
        }
    };

    Ok(Dispatch {
        index: matched.index,
        pattern: route.pattern.to_string(),
        params: matched.params,
        timeout: route.timeout.unwrap_or(snapshot.env().request_timeout),
        caller,
    })
}

/// Run the bound handler under its deadline.
async fn invoke(
    snapshot: Arc<Snapshot>,
    request: Request<Body>,
    request_id: String,
    dispatch: Dispatch,
) -> Response {
    let mode = snapshot.env().mode;
    let Some(handler) = snapshot.handler(dispatch.index).cloned() else {
        tracing::error!(route = %dispatch.pattern, "Route has no bound handler");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, None, mode);
    };

    // Dropped without `complete()` on timeout or client disconnect.
    let (guard, signal) = cancel_pair();
    let ctx = HandlerContext::new(request_id, dispatch.pattern.clone(), snapshot, signal);
    let call = AssertUnwindSafe(handler.call(ctx, request, dispatch.params, dispatch.caller))
        .catch_unwind();

    match tokio::time::timeout(dispatch.timeout, call).await {
        Ok(Ok(Ok(response))) => {
            guard.complete();
            response
        }
        Ok(Ok(Err(e))) => {
            guard.complete();
            tracing::error!(route = %dispatch.pattern, error = %e, "Handler failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(e.to_string()),
                mode,
            )
        }
        Ok(Err(panic)) => {
            guard.complete();
            let message = panic
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic");
            tracing::error!(route = %dispatch.pattern, panic = %message, "Handler panicked");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(format!("handler panicked: {message}")),
                mode,
            )
        }
        Err(_) => {
            drop(guard);
            tracing::warn!(
                route = %dispatch.pattern,
                timeout_ms = dispatch.timeout.as_millis() as u64,
                "Handler timed out"
            );
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                Some(format!(
                    "handler did not finish within {}ms",
                    dispatch.timeout.as_millis()
                )),
                mode,
            )
        }
    }
}
