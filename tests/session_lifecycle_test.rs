//! Session record and lifecycle behavior through the public API.

use std::time::{Duration, Instant};

use browser_tools::session::{
    CloseOutcome, SessionError, SessionRecord, SessionStore, close, wait_for_endpoint,
};
use tokio_util::sync::CancellationToken;

fn store_in(tmp: &tempfile::TempDir) -> SessionStore {
    SessionStore::at(tmp.path().join("browser-tools"))
}

#[test]
fn record_round_trips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(&tmp);
    let record = SessionRecord {
        url: "ws://127.0.0.1:9222".to_string(),
        pid: 12345,
    };

    assert!(!store.exists());
    store.save(&record).unwrap();
    assert!(store.exists());
    assert_eq!(store.load().unwrap(), record);
}

#[test]
fn double_start_is_rejected_by_the_record() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(&tmp);
    let record = SessionRecord {
        url: "ws://127.0.0.1:9222".to_string(),
        pid: 1,
    };
    store.save(&record).unwrap();

    match store.save(&record) {
        Err(SessionError::AlreadyRunning { pid }) => assert_eq!(pid, 1),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }
}

#[test]
fn close_is_idempotent_and_always_clears_the_record() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(&tmp);

    // Nothing running: success, not an error.
    assert_eq!(close(&store).unwrap(), CloseOutcome::NotRunning);

    // Record pointing at a dead pid: still closes and clears.
    store
        .save(&SessionRecord {
            url: "ws://127.0.0.1:9222".to_string(),
            pid: i32::MAX - 7,
        })
        .unwrap();
    assert!(matches!(close(&store).unwrap(), CloseOutcome::Closed { .. }));
    assert!(!store.exists());

    // And closing again is still fine.
    assert_eq!(close(&store).unwrap(), CloseOutcome::NotRunning);
}

#[tokio::test]
async fn readiness_follows_a_listener_coming_up() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    wait_for_endpoint(
        &format!("ws://{addr}"),
        Duration::from_secs(2),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn readiness_gives_up_at_the_deadline() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let max_wait = Duration::from_millis(400);
    let started = Instant::now();
    let err = wait_for_endpoint(
        &format!("ws://{addr}"),
        max_wait,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("not ready"), "{err}");
    assert!(started.elapsed() >= max_wait);
}
