//! Handler interface and registry.
//!
//! Domain code registers handlers by name at startup; `routes.yaml` refers to
//! them by that name. The core only sees the [`Handler`] trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use crate::config::schema::{EnvConfig, Mode};
use crate::routing::PathParams;
use crate::security::credentials::CallerIdentity;
use crate::snapshot::Snapshot;

/// Opaque handler failure, reported as `500`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<Response, HandlerError>;

/// A named request handler supplied by domain code.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        ctx: HandlerContext,
        request: Request<Body>,
        params: PathParams,
        caller: CallerIdentity,
    ) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext, Request<Body>, PathParams, CallerIdentity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        ctx: HandlerContext,
        request: Request<Body>,
        params: PathParams,
        caller: CallerIdentity,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(ctx, request, params, caller))
    }
}

pub type BoxedHandler = Arc<dyn Handler>;

/// Handlers by name. Populated once at startup, then shared read-only.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&BoxedHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

/// Cooperative cancellation observed by handlers.
///
/// Fires when the request times out or the client goes away before the
/// handler finishes. Never fires after a normal completion.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        let outcome = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if outcome.is_err() {
            // Completed without cancellation.
            std::future::pending::<()>().await;
        }
    }
}

/// Sender half of a [`CancelSignal`]; cancels when dropped unless completed.
#[derive(Debug)]
pub struct CancelOnDrop(Option<watch::Sender<bool>>);

impl CancelOnDrop {
    /// Mark the request finished without signalling cancellation.
    pub fn complete(mut self) {
        self.0.take();
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            tx.send_replace(true);
        }
    }
}

pub fn cancel_pair() -> (CancelOnDrop, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelOnDrop(Some(tx)), CancelSignal(rx))
}

/// Per-request context passed to handlers.
#[derive(Clone)]
pub struct HandlerContext {
    request_id: String,
    route: String,
    snapshot: Arc<Snapshot>,
    cancel: CancelSignal,
}

impl HandlerContext {
    pub fn new(
        request_id: impl Into<String>,
        route: impl Into<String>,
        snapshot: Arc<Snapshot>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            route: route.into(),
            snapshot,
            cancel,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Pattern of the matched route, e.g. `/accounts/:id`.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Version of the snapshot this request was matched against.
    pub fn snapshot_version(&self) -> u64 {
        self.snapshot.version()
    }

    pub fn env(&self) -> &EnvConfig {
        self.snapshot.env()
    }

    pub fn mode(&self) -> Mode {
        self.snapshot.env().mode
    }

    pub fn cancellation(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("request_id", &self.request_id)
            .field("route", &self.route)
            .field("snapshot_version", &self.snapshot.version())
            .finish()
    }
}
