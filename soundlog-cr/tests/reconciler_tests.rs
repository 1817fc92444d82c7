//! End-to-end tests for the polling reconciler
//!
//! Each test stands up a real query service on an ephemeral port,
//! seeded through the shared store layer, and runs the reconciler
//! against it.
//!
//! Tests cover:
//! - Cold-start fetch filling the cache and ranking classes
//! - Delta fetches merging without duplicating overlapped events
//! - Failed polls keeping the previous cache
//! - A 200 response with the wrong body shape keeping the previous cache
//! - Shutdown stopping the poll loop
//! - An unreachable service degrading to warnings, not panics

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use soundlog_common::db::connect_readonly;
use soundlog_common::time::now_epoch;
use soundlog_common::AudioEvent;
use soundlog_cr::{RankedClass, Reconciler, ReconcilerConfig};
use soundlog_qs::{build_router, AppState};

// === Test Helpers ===

fn db_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("soundlog.db")
}

/// Serve the real query service router over the store in `dir`.
///
/// Returns a shutdown trigger alongside the task: aborting the task
/// only kills the accept loop, while axum's per-connection tasks keep
/// serving established keep-alive connections. Sending on the trigger
/// and awaiting the task closes those connections too, so a test that
/// needs the service genuinely dead must use the trigger.
async fn serve(path: &Path) -> (SocketAddr, JoinHandle<()>, tokio::sync::oneshot::Sender<()>) {
    let reader = connect_readonly(path).await.unwrap();
    let app = build_router(AppState::new(reader));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();
    });
    (addr, task, stop_tx)
}

fn config_for(addr: SocketAddr) -> ReconcilerConfig {
    ReconcilerConfig {
        base_url: format!("http://{addr}"),
        poll_interval: Duration::from_millis(100),
        ..ReconcilerConfig::default()
    }
}

fn event(ts: f64, class: i64, cf: f64) -> AudioEvent {
    AudioEvent {
        id: None,
        ts,
        raw_ts: None,
        db: Some(-42.0),
        c1_idx: class,
        c1_cf: cf,
        c2_idx: None,
        c2_cf: None,
        c3_idx: None,
        c3_cf: None,
    }
}

// === Cold Start ===

#[tokio::test]
async fn test_cold_start_fills_cache_and_ranks_classes() {
    let dir = TempDir::new().unwrap();
    let pool = soundlog_common::db::init_database(&db_path(&dir)).await.unwrap();
    soundlog_common::db::upsert_class_row(&pool, 0, Some("/m/09x0r"), "Speech")
        .await
        .unwrap();
    soundlog_common::db::upsert_class_row(&pool, 132, Some("/m/04rlf"), "Music")
        .await
        .unwrap();
    soundlog_common::db::upsert_class_row(&pool, 69, Some("/m/0bt9lr"), "Dog")
        .await
        .unwrap();

    let now = now_epoch();
    for i in 0..10 {
        soundlog_common::db::append_event(&pool, &event(now - 100.0 - i as f64, 0, 90.0))
            .await
            .unwrap();
    }
    for i in 0..5 {
        soundlog_common::db::append_event(&pool, &event(now - 200.0 - i as f64, 132, 80.0))
            .await
            .unwrap();
    }
    soundlog_common::db::append_event(&pool, &event(now - 300.0, 69, 70.0))
        .await
        .unwrap();

    let (addr, server, _stop) = serve(&db_path(&dir)).await;
    let handle = Reconciler::spawn(config_for(addr)).unwrap();
    let mut snapshots = handle.snapshots();

    timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("first snapshot within deadline")
        .unwrap();
    let snapshot = snapshots.borrow_and_update().clone().expect("snapshot");

    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.fetched, 16);
    assert_eq!(snapshot.events.len(), 16);
    assert_eq!(snapshot.store_total, 16);

    // Three classes ranked, bottom two thirds dropped
    assert_eq!(snapshot.classes, vec![RankedClass { class: 0, count: 10 }]);
    assert_eq!(snapshot.class_names.get(&0).map(String::as_str), Some("Speech"));
    assert_eq!(snapshot.class_names.get(&69).map(String::as_str), Some("Dog"));

    // Cache is ascending by timestamp
    for pair in snapshot.events.windows(2) {
        assert!(pair[0].ts <= pair[1].ts);
    }

    handle.shutdown().await;
    server.abort();
}

// === Delta Fetches ===

#[tokio::test]
async fn test_delta_fetch_merges_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let pool = soundlog_common::db::init_database(&db_path(&dir)).await.unwrap();

    let now = now_epoch();
    for (i, ts) in [now - 50.0, now - 40.0, now - 30.0].iter().enumerate() {
        soundlog_common::db::append_event(&pool, &event(*ts, i as i64, 80.0))
            .await
            .unwrap();
    }

    let (addr, server, _stop) = serve(&db_path(&dir)).await;
    let handle = Reconciler::spawn(config_for(addr)).unwrap();
    let mut snapshots = handle.snapshots();

    timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("first snapshot within deadline")
        .unwrap();
    let first = snapshots.borrow_and_update().clone().expect("snapshot");
    assert_eq!(first.events.len(), 3);

    // A new event lands after the cold fetch; only a delta should be
    // needed to pick it up
    soundlog_common::db::append_event(&pool, &event(now_epoch(), 7, 95.0))
        .await
        .unwrap();

    let grown = timeout(Duration::from_secs(5), async {
        loop {
            snapshots.changed().await.unwrap();
            let snapshot = snapshots.borrow_and_update().clone().expect("snapshot");
            if snapshot.events.len() >= 4 {
                break snapshot;
            }
        }
    })
    .await
    .expect("delta snapshot within deadline");

    assert_eq!(grown.events.len(), 4);
    assert!(grown.events.iter().any(|ev| ev.c1_idx == 7));

    // The inclusive overlap at the newest cached timestamp must not
    // leave duplicates behind
    let identities: HashSet<(i64, u64)> = grown
        .events
        .iter()
        .map(|ev| (ev.c1_idx, ev.ts.to_bits()))
        .collect();
    assert_eq!(identities.len(), grown.events.len());

    handle.shutdown().await;
    server.abort();
}

// === Failure Handling ===

#[tokio::test]
async fn test_failed_poll_keeps_cached_events() {
    let dir = TempDir::new().unwrap();
    let pool = soundlog_common::db::init_database(&db_path(&dir)).await.unwrap();

    let now = now_epoch();
    soundlog_common::db::append_event(&pool, &event(now - 20.0, 0, 80.0))
        .await
        .unwrap();
    soundlog_common::db::append_event(&pool, &event(now - 10.0, 1, 80.0))
        .await
        .unwrap();

    let (addr, server, stop) = serve(&db_path(&dir)).await;
    let handle = Reconciler::spawn(config_for(addr)).unwrap();
    let mut snapshots = handle.snapshots();

    timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("first snapshot within deadline")
        .unwrap();
    assert_eq!(
        snapshots.borrow_and_update().clone().expect("snapshot").events.len(),
        2
    );

    // Kill the service; polls now fail with connection errors
    let _ = stop.send(());
    let _ = server.await;
    tokio::time::sleep(Duration::from_millis(350)).await;

    // Drain anything published before the server died, then confirm
    // failed ticks publish nothing new
    if snapshots.has_changed().unwrap() {
        let last = snapshots.borrow_and_update().clone().expect("snapshot");
        assert_eq!(last.events.len(), 2);
    }
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!snapshots.has_changed().unwrap());

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("clean shutdown while failing");
}

#[tokio::test]
async fn test_malformed_response_keeps_cached_events() {
    let dir = TempDir::new().unwrap();
    let pool = soundlog_common::db::init_database(&db_path(&dir)).await.unwrap();

    let now = now_epoch();
    soundlog_common::db::append_event(&pool, &event(now - 20.0, 0, 80.0))
        .await
        .unwrap();
    soundlog_common::db::append_event(&pool, &event(now - 10.0, 1, 80.0))
        .await
        .unwrap();

    let (addr, server, stop) = serve(&db_path(&dir)).await;
    let handle = Reconciler::spawn(config_for(addr)).unwrap();
    let mut snapshots = handle.snapshots();

    timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("first snapshot within deadline")
        .unwrap();
    assert_eq!(
        snapshots.borrow_and_update().clone().expect("snapshot").events.len(),
        2
    );

    // Swap the service for one that answers 200 OK with a body that is
    // not a window response; polls now fail at the decode step instead
    // of the transport
    let _ = stop.send(());
    let _ = server.await;
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let wrong_shape = axum::Router::new().fallback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { r#"{"data": "not an event list"}"# }
    });
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let decoy = tokio::spawn(async move {
        axum::serve(listener, wrong_shape).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(hits.load(Ordering::SeqCst) > 0, "decoy service was never polled");

    // Anything still pending was published by the real service before
    // the swap; decode failures afterwards publish nothing new
    if snapshots.has_changed().unwrap() {
        let last = snapshots.borrow_and_update().clone().expect("snapshot");
        assert_eq!(last.events.len(), 2);
    }
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!snapshots.has_changed().unwrap());

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("clean shutdown while decoding fails");
    decoy.abort();
}

#[tokio::test]
async fn test_unreachable_service_degrades_without_panicking() {
    let config = ReconcilerConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        poll_interval: Duration::from_millis(100),
        ..ReconcilerConfig::default()
    };
    let handle = Reconciler::spawn(config).unwrap();
    let snapshots = handle.snapshots();

    tokio::time::sleep(Duration::from_millis(350)).await;

    // Several ticks have failed; no snapshot, but the task is alive
    // (a panicked task would have dropped the sender)
    assert!(!snapshots.has_changed().unwrap());
    assert!(snapshots.borrow().is_none());

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("clean shutdown while unreachable");
}

// === Shutdown ===

#[tokio::test]
async fn test_shutdown_stops_polling() {
    let dir = TempDir::new().unwrap();
    let pool = soundlog_common::db::init_database(&db_path(&dir)).await.unwrap();
    soundlog_common::db::append_event(&pool, &event(now_epoch() - 5.0, 0, 80.0))
        .await
        .unwrap();

    let (addr, server, _stop) = serve(&db_path(&dir)).await;
    let handle = Reconciler::spawn(config_for(addr)).unwrap();
    let mut snapshots = handle.snapshots();

    timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("first snapshot within deadline")
        .unwrap();

    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("shutdown within deadline");

    // The poll task is gone, so the snapshot channel is closed
    assert!(snapshots.has_changed().is_err());

    server.abort();
}
