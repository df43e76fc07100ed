//! Shared fixtures for integration and load testing.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::IntoResponse;
use caaspay_api::config::{ConfigSources, ConfigStore, EnvOverrides};
use caaspay_api::http::builtin;
use caaspay_api::routing::PathParams;
use caaspay_api::security::{X_CALLER_ID, X_CALLER_SECRET};
use caaspay_api::{CallerIdentity, HandlerContext, HandlerRegistry, HandlerResult, ReloadCoordinator};

pub const API_DEBUG: &str = "mode: debug\nport: 8080\nrequest_timeout_ms: 2000\n";
pub const API_RELEASE: &str = "mode: release\nport: 8080\nrequest_timeout_ms: 2000\n";

pub const ROUTES: &str = r#"
- method: GET
  path: /accounts/:id
  handler: echo
  capabilities: [read:accounts]
- method: GET
  path: /accounts/me
  handler: echo
  capabilities: [read:accounts]
- method: POST
  path: /accounts/:id/transfers
  handler: echo
  capabilities: [write:accounts]
- method: GET
  path: /health
  handler: health
  public: true
- method: GET
  path: /slow
  handler: slow
  public: true
  timeout_ms: 50
- method: GET
  path: /fail
  handler: fail
  public: true
- method: GET
  path: /panic
  handler: panic
  public: true
- method: GET
  path: /pause
  handler: pause
  public: true
"#;

/// Two routes with the same shape under GET.
pub const CONFLICTING_ROUTES: &str = r#"
- method: GET
  path: /accounts/:id
  handler: echo
- method: GET
  path: /accounts/:accountId
  handler: echo
"#;

// svc-a / alpha, svc-b / bravo, svc-old / old (revoked)
pub const CREDENTIALS: &str = r#"
- id: svc-a
  secret_hash: sha256:8ed3f6ad685b959ead7022518e1af76cd816f8e8ec7ccdda1ed4018e8f2223f8
  capabilities: [read:accounts]
- id: svc-b
  secret_hash: sha256:f144a6907dc4284d1f9fe6a7d9b9ff53c02c1d07ba68f24d413d7ff7f757a782
  capabilities: []
- id: svc-old
  secret_hash: sha256:cba06b5736faf67e54b07b561eae94395e774c517a7d910a54369e1263ccfbd4
  capabilities: [read:accounts]
  status: revoked
"#;

async fn slow(
    ctx: HandlerContext,
    _request: Request<Body>,
    _params: PathParams,
    _caller: CallerIdentity,
) -> HandlerResult {
    tokio::select! {
        _ = ctx.cancellation().cancelled() => Ok("cancelled".into_response()),
        _ = tokio::time::sleep(Duration::from_secs(5)) => Ok("late".into_response()),
    }
}

async fn fail(
    _ctx: HandlerContext,
    _request: Request<Body>,
    _params: PathParams,
    _caller: CallerIdentity,
) -> HandlerResult {
    Err("ledger unavailable".into())
}

async fn panics(
    _ctx: HandlerContext,
    _request: Request<Body>,
    _params: PathParams,
    _caller: CallerIdentity,
) -> HandlerResult {
    panic!("handler exploded")
}

/// Sleeps briefly, then reports the mode and version it was matched under.
async fn pause(
    ctx: HandlerContext,
    _request: Request<Body>,
    _params: PathParams,
    _caller: CallerIdentity,
) -> HandlerResult {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(format!("{}:{}", ctx.mode(), ctx.snapshot_version()).into_response())
}

pub fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    builtin::register(&mut registry);
    registry
        .register("slow", slow)
        .register("fail", fail)
        .register("panic", panics)
        .register("pause", pause);
    registry
}

/// Coordinator over in-memory sources, with no directory behind it.
pub fn coordinator(api: &str, routes: &str, credentials: &str) -> Arc<ReloadCoordinator> {
    let store = ConfigStore::new(EnvOverrides::default(), registry());
    let sources = ConfigSources::new(api, routes, credentials);
    Arc::new(ReloadCoordinator::bootstrap(store, &sources).unwrap())
}

/// A fresh directory under the system temp dir.
pub struct TempConfigDir {
    path: PathBuf,
}

impl TempConfigDir {
    pub fn new(api: &str, routes: &str, credentials: &str) -> Self {
        let path = std::env::temp_dir().join(format!("caaspay-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        let dir = Self { path };
        dir.write(api, routes, credentials);
        dir
    }

    pub fn write(&self, api: &str, routes: &str, credentials: &str) {
        std::fs::write(self.path.join("api.yaml"), api).unwrap();
        std::fs::write(self.path.join("routes.yaml"), routes).unwrap();
        std::fs::write(self.path.join("credentials.yaml"), credentials).unwrap();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempConfigDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn request(method: Method, path: &str, caller: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some((id, secret)) = caller {
        builder = builder
            .header(X_CALLER_ID, id)
            .header(X_CALLER_SECRET, secret);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
