mod common;
use common::{count_with_status, heart_rate, setup_db};

use chrono::{TimeZone, Utc};
use diesel::prelude::*;

use vitals_core::metric::MetricType;
use vitals_sync::config::WorkerConfig;
use vitals_sync::rollup;
use vitals_sync::store::{RawVitalStore, SqliteVitalStore};
use vitals_sync::worker::{FailureCounts, process_batch};

#[test]
fn crashed_pass_is_recovered_on_startup() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    let hour = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
    for minute in 0..5 {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, minute, 0).unwrap();
        store
            .submit(&mut conn, &heart_rate(7, ts, 70.0 + minute as f64))
            .unwrap();
    }

    // a worker claims the batch and then "crashes" before aggregating:
    // the rows stay in processing and would be invisible to claims forever
    let claimed = store.claim_pending(&mut conn, 100).unwrap();
    assert_eq!(claimed.len(), 5);
    drop(claimed);
    assert_eq!(count_with_status(&mut conn, "processing"), 5);
    assert_eq!(process_batch(&mut conn, &WorkerConfig::default(), &mut failures).unwrap(), 0);

    // the startup recovery pass reverts them, and a normal drain follows
    assert_eq!(store.recover_stuck_processing(&mut conn).unwrap(), 5);
    assert_eq!(count_with_status(&mut conn, "pending"), 5);
    while process_batch(&mut conn, &WorkerConfig::default(), &mut failures).unwrap() > 0 {}

    assert_eq!(count_with_status(&mut conn, "completed"), 5);
    let stats = rollup::get_hourly(&mut conn, 7, MetricType::HeartRate, hour)
        .unwrap()
        .expect("hourly row")
        .stats()
        .unwrap();
    assert_eq!(stats.sample_count, 5);
}

#[test]
fn completed_rows_carry_aggregated_at() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, 5, 0).unwrap();
    store.submit(&mut conn, &heart_rate(7, ts, 70.0)).unwrap();
    process_batch(&mut conn, &WorkerConfig::default(), &mut failures).unwrap();

    use vitals_sync::schema::raw_vitals::dsl as rv;
    let aggregated_at: Option<String> = rv::raw_vitals
        .select(rv::aggregated_at)
        .first(&mut conn)
        .unwrap();
    assert!(aggregated_at.is_some());
}

#[test]
fn unreadable_rows_are_quarantined_not_retried() {
    let (_db, mut conn) = setup_db();
    let mut failures = FailureCounts::new();

    // bypass the typed boundary to plant a row with a corrupt metric code
    use vitals_sync::schema::raw_vitals::dsl as rv;
    diesel::insert_into(rv::raw_vitals)
        .values((
            rv::user_id.eq(7i64),
            rv::metric_type.eq("mystery_metric"),
            rv::value.eq(1.0),
            rv::unit.eq("?"),
            rv::start_ts.eq("2025-03-10T14:05:00.000Z"),
            rv::end_ts.eq("2025-03-10T14:05:00.000Z"),
            rv::data_source.eq("device_sync"),
            rv::created_at.eq("2025-03-10T14:05:01.000Z"),
            rv::updated_at.eq("2025-03-10T14:05:01.000Z"),
        ))
        .execute(&mut conn)
        .unwrap();

    assert_eq!(process_batch(&mut conn, &WorkerConfig::default(), &mut failures).unwrap(), 1);
    assert_eq!(count_with_status(&mut conn, "failed"), 1);
    assert_eq!(count_with_status(&mut conn, "pending"), 0);

    // the poison row never comes back
    assert_eq!(process_batch(&mut conn, &WorkerConfig::default(), &mut failures).unwrap(), 0);
}
