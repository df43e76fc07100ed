//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum app around the dynamic [`Router`]
//! - Wire up middleware (request ID, tracing, panics, body limit)
//! - Serve until shutdown, draining in-flight requests
//!
//! # Design Decisions
//! - The route table is not mounted into axum; a single fallback dispatches
//!   every request so that reloads never rebuild the service stack
//! - The body limit is read from the first snapshot and fixed for the life
//!   of the listener

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::request::MakeRequestUuid;
use crate::http::response::panic_response;
use crate::lifecycle::reload::ReloadCoordinator;
use crate::lifecycle::shutdown;
use crate::routing::Router;

/// Public HTTP surface.
pub struct HttpServer {
    coordinator: Arc<ReloadCoordinator>,
    router: Router,
}

impl HttpServer {
    pub fn new(coordinator: Arc<ReloadCoordinator>) -> Self {
        let router = Router::new(coordinator.snapshots());
        Self {
            coordinator,
            router,
        }
    }

    /// The axum app with all middleware layers.
    pub fn app(&self) -> axum::Router {
        let max_body_bytes = self.coordinator.current().env().max_body_bytes;
        let router = self.router.clone();

        axum::Router::new()
            .fallback(move |request: Request<Body>| async move { router.handle(request).await })
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(RequestBodyLimitLayer::new(max_body_bytes)),
            )
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let snapshot = self.coordinator.current();
        tracing::info!(
            address = %addr,
            mode = %snapshot.env().mode,
            version = snapshot.version(),
            "HTTP server starting"
        );

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown::wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}
