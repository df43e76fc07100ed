//! Failure injection: handler errors, timeouts, panics and rejected reloads.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use caaspay_api::config::ConfigSources;
use caaspay_api::http::request::X_REQUEST_ID;
use caaspay_api::lifecycle::ReloadError;
use caaspay_api::{HttpServer, Mode, SnapshotError};
use tower::ServiceExt;

mod common;

use common::{API_DEBUG, API_RELEASE, CONFLICTING_ROUTES, CREDENTIALS, ROUTES};

#[tokio::test]
async fn test_handler_timeout_returns_504() {
    let app = HttpServer::new(common::coordinator(API_DEBUG, ROUTES, CREDENTIALS)).app();

    let response = app
        .oneshot(common::request(Method::GET, "/slow", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = common::body_json(response).await;
    assert_eq!(body["code"], 504);
    assert_eq!(body["error"], "gateway timeout");
}

#[tokio::test]
async fn test_handler_error_returns_500_with_debug_details() {
    let app = HttpServer::new(common::coordinator(API_DEBUG, ROUTES, CREDENTIALS)).app();
    let response = app
        .oneshot(common::request(Method::GET, "/fail", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["details"], "ledger unavailable");
}

#[tokio::test]
async fn test_release_mode_hides_details() {
    let app = HttpServer::new(common::coordinator(API_RELEASE, ROUTES, CREDENTIALS)).app();
    let response = app
        .oneshot(common::request(Method::GET, "/fail", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert!(body.get("details").is_none());
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn test_handler_panic_returns_500() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);
    let app = HttpServer::new(coordinator.clone()).app();

    let response = app
        .clone()
        .oneshot(common::request(Method::GET, "/panic", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Other requests are unaffected.
    let response = app
        .oneshot(common::request(Method::GET, "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_conflicting_reload_leaves_snapshot_in_place() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);
    let app = HttpServer::new(coordinator.clone()).app();

    let before = app
        .clone()
        .oneshot(common::request(Method::GET, "/accounts/42", Some(("svc-a", "alpha"))))
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::OK);

    let err = coordinator
        .reload(&ConfigSources::new(API_DEBUG, CONFLICTING_ROUTES, CREDENTIALS))
        .unwrap_err();
    assert!(matches!(err, ReloadError::Rejected(SnapshotError::Conflict(_))));
    assert_eq!(coordinator.current().version(), 1);

    let after = app
        .oneshot(common::request(Method::GET, "/accounts/42", Some(("svc-a", "alpha"))))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::OK);
    let body = common::body_json(after).await;
    assert_eq!(body["params"]["id"], "42");
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn test_malformed_reload_is_rejected() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);

    let cases = [
        ConfigSources::new("port: 8080\n", ROUTES, CREDENTIALS),
        ConfigSources::new(API_DEBUG, "- method: FETCH\n  path: /a\n  handler: echo\n", CREDENTIALS),
        ConfigSources::new(API_DEBUG, "- method: GET\n  path: /a\n  handler: missing\n", CREDENTIALS),
        ConfigSources::new(API_DEBUG, ROUTES, "- id: svc-a\n  secret_hash: md5:abc\n"),
    ];
    for sources in &cases {
        assert!(coordinator.reload(sources).is_err());
    }
    assert_eq!(coordinator.current().version(), 1);
    assert_eq!(coordinator.current().env().mode, Mode::Debug);
}

#[tokio::test]
async fn test_in_flight_request_keeps_its_snapshot() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);
    let app = HttpServer::new(coordinator.clone()).app();

    let in_flight = tokio::spawn(
        app.clone()
            .oneshot(common::request(Method::GET, "/pause", None)),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    let applied = coordinator
        .reload(&ConfigSources::new(API_RELEASE, ROUTES, CREDENTIALS))
        .unwrap();
    assert_eq!(applied.version, 2);

    let old = in_flight.await.unwrap().unwrap();
    assert_eq!(common::body_text(old).await, "debug:1");

    let new = app
        .oneshot(common::request(Method::GET, "/pause", None))
        .await
        .unwrap();
    assert_eq!(common::body_text(new).await, "release:2");
}

#[tokio::test]
async fn test_every_response_carries_request_id() {
    let app = HttpServer::new(common::coordinator(API_DEBUG, ROUTES, CREDENTIALS)).app();

    let generated = app
        .clone()
        .oneshot(common::request(Method::GET, "/nowhere", None))
        .await
        .unwrap();
    assert_eq!(generated.status(), StatusCode::NOT_FOUND);
    assert!(generated.headers().contains_key(X_REQUEST_ID));

    let mut request = common::request(Method::GET, "/health", None);
    request
        .headers_mut()
        .insert(X_REQUEST_ID, "req-from-client".parse().unwrap());
    let propagated = app.oneshot(request).await.unwrap();
    assert_eq!(propagated.headers()[X_REQUEST_ID], "req-from-client");
}

#[tokio::test]
async fn test_reload_from_disk_picks_up_edits() {
    let dir = common::TempConfigDir::new(API_DEBUG, ROUTES, CREDENTIALS);
    let coordinator = caaspay_api::lifecycle::startup::bootstrap(
        dir.path(),
        Default::default(),
        common::registry(),
    )
    .unwrap();
    assert_eq!(coordinator.current().version(), 1);

    dir.write(API_DEBUG, CONFLICTING_ROUTES, CREDENTIALS);
    assert!(coordinator.reload_from_disk().is_err());
    assert_eq!(coordinator.current().version(), 1);

    std::fs::remove_file(dir.path().join("credentials.yaml")).unwrap();
    assert!(coordinator.reload_from_disk().is_err());

    dir.write(API_RELEASE, ROUTES, CREDENTIALS);
    let applied = coordinator.reload_from_disk().unwrap();
    assert_eq!(applied.version, 2);
    assert_eq!(coordinator.current().env().mode, Mode::Release);
}
