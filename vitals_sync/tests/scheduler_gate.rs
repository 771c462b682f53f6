mod common;
use common::setup_db;

use std::sync::Arc;
use std::time::Duration;

use vitals_sync::activity::SyncActivityTracker;
use vitals_sync::config::WorkerConfig;
use vitals_sync::scheduler::{AggregationScheduler, IngestKind};

fn fast_cfg(database_url: &str) -> WorkerConfig {
    WorkerConfig {
        database_url: database_url.to_string(),
        tick_secs: 1,
        aggregation_delay_bulk_secs: 2,
        aggregation_delay_incremental_secs: 1,
        ..WorkerConfig::default()
    }
}

async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[test]
fn should_start_respects_gate_conditions() {
    let tracker = Arc::new(SyncActivityTracker::new());
    let scheduler = AggregationScheduler::new(tracker.clone(), fast_cfg("unused.db"));

    // nothing ever happened: the gate is open
    assert!(scheduler.should_start(IngestKind::Incremental));

    // fresh activity closes it until the cooldown elapses
    tracker.note_activity();
    assert!(!scheduler.should_start(IngestKind::Incremental));

    // an in-flight sync operation closes it regardless of elapsed time
    tracker.start(1, "op");
    assert!(!scheduler.should_start(IngestKind::Incremental));
    tracker.end(1, "op");
    assert!(!scheduler.should_start(IngestKind::Incremental)); // end re-stamped activity
}

#[tokio::test(flavor = "multi_thread")]
async fn burst_of_submissions_starts_the_worker_once() {
    let (db, _conn) = setup_db();
    let tracker = Arc::new(SyncActivityTracker::new());
    let scheduler = AggregationScheduler::new(tracker.clone(), fast_cfg(&db.path));

    // a burst of incremental submissions, all inside the cooldown window
    for _ in 0..30 {
        tracker.note_activity();
        scheduler.schedule_reevaluation(IngestKind::Incremental);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // well before the cooldown has elapsed nothing may start
    assert_eq!(scheduler.starts_total(), 0);

    // ... and once it elapses, exactly one start happens
    assert!(wait_until(Duration::from_secs(5), || scheduler.starts_total() == 1).await);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(scheduler.starts_total(), 1);

    scheduler.stop_worker().await;
    assert!(!scheduler.is_started());
}

#[tokio::test(flavor = "multi_thread")]
async fn active_operation_holds_the_gate_until_it_ends() {
    let (db, _conn) = setup_db();
    let tracker = Arc::new(SyncActivityTracker::new());
    let scheduler = AggregationScheduler::new(tracker.clone(), fast_cfg(&db.path));

    tracker.start(1, "backfill");
    scheduler.schedule_reevaluation(IngestKind::Bulk);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(scheduler.starts_total(), 0, "gate opened during an active operation");

    tracker.end(1, "backfill");
    assert!(wait_until(Duration::from_secs(8), || scheduler.starts_total() == 1).await);

    scheduler.stop_worker().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn start_is_idempotent_and_restartable_after_stop() {
    let (db, _conn) = setup_db();
    let tracker = Arc::new(SyncActivityTracker::new());
    let scheduler = AggregationScheduler::new(tracker, fast_cfg(&db.path));

    scheduler.start_worker();
    scheduler.start_worker(); // no-op while running
    assert!(scheduler.is_started());
    assert_eq!(scheduler.starts_total(), 1);

    scheduler.stop_worker().await;
    assert!(!scheduler.is_started());

    scheduler.start_worker();
    assert_eq!(scheduler.starts_total(), 2);
    scheduler.stop_worker().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_crash_resets_the_started_flag() {
    // a database path that cannot be opened makes the worker fail fast
    let tracker = Arc::new(SyncActivityTracker::new());
    let scheduler =
        AggregationScheduler::new(tracker, fast_cfg("/nonexistent-dir/vitals.db"));

    scheduler.start_worker();
    assert_eq!(scheduler.starts_total(), 1);

    // the crash must reset the flag, or the worker could never restart
    assert!(wait_until(Duration::from_secs(5), || !scheduler.is_started()).await);
}
