//! Reloads driven through the trigger loop and the directory watcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use caaspay_api::config::watcher::ConfigWatcher;
use caaspay_api::http::builtin::HEALTH;
use caaspay_api::lifecycle::reload::run_reload_loop;
use caaspay_api::lifecycle::{startup, ReloadTrigger, Shutdown};
use caaspay_api::{Mode, ReloadCoordinator};
use tokio::sync::mpsc;

mod common;

use common::{TempConfigDir, API_DEBUG, API_RELEASE, CREDENTIALS, ROUTES};

fn bootstrap(dir: &TempConfigDir) -> Arc<ReloadCoordinator> {
    startup::bootstrap(dir.path(), Default::default(), common::registry()).unwrap()
}

async fn eventually(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    done()
}

#[tokio::test]
async fn test_trigger_burst_applies_a_single_reload() {
    let dir = TempConfigDir::new(API_DEBUG, ROUTES, CREDENTIALS);
    let coordinator = bootstrap(&dir);
    let shutdown = Shutdown::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let reload_loop = tokio::spawn(run_reload_loop(
        coordinator.clone(),
        rx,
        shutdown.subscribe(),
    ));

    dir.write(API_RELEASE, ROUTES, CREDENTIALS);
    for trigger in [
        ReloadTrigger::FileChange,
        ReloadTrigger::FileChange,
        ReloadTrigger::Signal,
        ReloadTrigger::Admin,
        ReloadTrigger::FileChange,
    ] {
        tx.send(trigger).unwrap();
    }

    assert!(eventually(Duration::from_secs(5), || coordinator.current().version() >= 2).await);

    // Several debounce windows pass without another publish.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let current = coordinator.current();
    assert_eq!(current.version(), 2);
    assert_eq!(current.env().mode, Mode::Release);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), reload_loop)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_rejected_trigger_keeps_version() {
    let dir = TempConfigDir::new(API_DEBUG, ROUTES, CREDENTIALS);
    let coordinator = bootstrap(&dir);
    let shutdown = Shutdown::new();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_reload_loop(coordinator.clone(), rx, shutdown.subscribe()));

    std::fs::write(dir.path().join("routes.yaml"), "- method: GET\n  path: nope\n").unwrap();
    tx.send(ReloadTrigger::Signal).unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(coordinator.current().version(), 1);

    dir.write(API_DEBUG, ROUTES, CREDENTIALS);
    tx.send(ReloadTrigger::Signal).unwrap();
    assert!(eventually(Duration::from_secs(5), || coordinator.current().version() == 2).await);

    shutdown.trigger();
}

#[tokio::test]
async fn test_editing_routes_file_reloads_through_watcher() {
    let dir = TempConfigDir::new(API_DEBUG, ROUTES, CREDENTIALS);
    let coordinator = bootstrap(&dir);
    let initial_routes = coordinator.current().routes().len();

    let shutdown = Shutdown::new();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_reload_loop(coordinator.clone(), rx, shutdown.subscribe()));
    let _watcher = ConfigWatcher::new(dir.path(), tx).run().unwrap();

    let edited = format!("{ROUTES}- method: GET\n  path: /added\n  handler: {HEALTH}\n  public: true\n");
    std::fs::write(dir.path().join("routes.yaml"), edited).unwrap();

    let reloaded = eventually(Duration::from_secs(10), || {
        let current = coordinator.current();
        current.version() >= 2 && current.routes().len() == initial_routes + 1
    })
    .await;
    assert!(reloaded, "watcher did not publish the edited routes");

    shutdown.trigger();
}
