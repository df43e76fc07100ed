//! Metrics collection and exposition.
//!
//! # Metrics
//! - `caaspay_requests_total` (counter): requests by method, status, route
//! - `caaspay_request_duration_seconds` (histogram): latency by method, route
//! - `caaspay_auth_denied_total` (counter): credential denials by reason
//! - `caaspay_reloads_total` (counter): reload attempts by outcome
//! - `caaspay_snapshot_version` (gauge): version of the published snapshot
//!
//! The `route` label is the matched pattern, never the raw path, so label
//! cardinality is bounded by `routes.yaml`.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "caaspay_requests_total";
pub const REQUEST_DURATION: &str = "caaspay_request_duration_seconds";
pub const AUTH_DENIED_TOTAL: &str = "caaspay_auth_denied_total";
pub const RELOADS_TOTAL: &str = "caaspay_reloads_total";
pub const SNAPSHOT_VERSION: &str = "caaspay_snapshot_version";

/// Route label for requests that matched nothing.
pub const UNMATCHED_ROUTE: &str = "unmatched";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once and return its handle.
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_counter!(REQUESTS_TOTAL, "Total requests by method, status and route");
    describe_histogram!(REQUEST_DURATION, "Request latency in seconds");
    describe_counter!(AUTH_DENIED_TOTAL, "Requests rejected by credential checks");
    describe_counter!(RELOADS_TOTAL, "Configuration reload attempts by outcome");
    describe_gauge!(SNAPSHOT_VERSION, "Version of the active configuration snapshot");

    let handle = PROMETHEUS_HANDLE.get_or_init(|| handle).clone();
    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Serve the scrape endpoint on `addr` until the process exits.
pub async fn serve_metrics(addr: SocketAddr) -> std::io::Result<()> {
    let app = axum::Router::new().route("/metrics", axum::routing::get(render_metrics));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Metrics listener started");
    axum::serve(listener, app).await
}

async fn render_metrics() -> impl IntoResponse {
    match prometheus_handle() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics not initialized".to_string(),
        ),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(
        REQUEST_DURATION,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration);
}

pub fn record_auth_denied(reason: &'static str) {
    counter!(AUTH_DENIED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_reload(outcome: &'static str) {
    counter!(RELOADS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_snapshot_version(version: u64) {
    gauge!(SNAPSHOT_VERSION).set(version as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, "/accounts/:id", Instant::now());
        record_auth_denied("bad_secret");
        record_reload("applied");
        record_snapshot_version(3);
    }

    #[tokio::test]
    async fn test_render_before_init() {
        if prometheus_handle().is_none() {
            let response = render_metrics().await.into_response();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }
}
