//! Load testing over a real socket, with reloads running underneath.

use std::time::{Duration, Instant};

use caaspay_api::config::ConfigSources;
use caaspay_api::{HttpServer, Shutdown};
use caaspay_sdk::{CaaspayClient, Credentials};

mod common;

use common::{API_DEBUG, API_RELEASE, CREDENTIALS, ROUTES};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_during_reloads() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);

    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(coordinator.clone());
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let base_url = format!("http://{}", addr);
    let start = Instant::now();

    let reloader = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                let api = if i % 2 == 0 { API_RELEASE } else { API_DEBUG };
                coordinator
                    .reload(&ConfigSources::new(api, ROUTES, CREDENTIALS))
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let mut tasks = Vec::new();
    for t in 0..concurrency {
        let client = CaaspayClient::new(&base_url).with_credentials(Credentials::new("svc-a", "alpha"));
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut failures = 0usize;
            for i in 0..requests_per_task {
                let req_start = Instant::now();
                let path = format!("/accounts/{}-{}", t, i);
                match client.get_json::<serde_json::Value>(&path).await {
                    Ok(body) if body["params"]["id"] == format!("{}-{}", t, i) => {
                        latencies.push(req_start.elapsed());
                    }
                    _ => failures += 1,
                }
            }
            (latencies, failures)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut failures = 0;
    for task in tasks {
        let (latencies, failed) = task.await.unwrap();
        all_latencies.extend(latencies);
        failures += failed;
    }
    reloader.await.unwrap();

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(failures, 0, "requests failed during reloads");
    assert_eq!(coordinator.current().version(), 11);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), server_task).await;
}

#[tokio::test]
async fn test_sdk_surfaces_api_errors() {
    let coordinator = common::coordinator(API_DEBUG, ROUTES, CREDENTIALS);
    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(coordinator);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = CaaspayClient::new(&format!("http://{}", addr))
        .with_credentials(Credentials::new("svc-b", "bravo"));
    let err = client
        .get_json::<serde_json::Value>("/accounts/1")
        .await
        .unwrap_err();
    let api_error = err
        .downcast_ref::<caaspay_sdk::ApiError>()
        .expect("structured API error");
    assert_eq!(api_error.code, 403);
    assert_eq!(api_error.details.as_deref(), Some("insufficient capability"));

    shutdown.trigger();
}
