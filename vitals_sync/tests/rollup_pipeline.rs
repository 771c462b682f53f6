mod common;
use common::{heart_rate, setup_db, steps, workout};

use chrono::{Days, NaiveDate, TimeZone, Utc};
use std::collections::HashSet;

use vitals_core::metric::MetricType;
use vitals_sync::config::WorkerConfig;
use vitals_sync::rollup;
use vitals_sync::store::{RawVitalStore, SqliteVitalStore};
use vitals_sync::worker::{FailureCounts, process_batch};

// 2025-03-10 is a Monday, so the daily/weekly keys coincide and the
// expectations below stay easy to eyeball.
const USER: i64 = 42;

fn cfg() -> WorkerConfig {
    WorkerConfig::default()
}

#[test]
fn heart_rate_scenario_across_all_granularities() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    let hour = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
    for (minute, bpm) in [(5, 72.0), (20, 80.0), (40, 76.0)] {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, minute, 0).unwrap();
        store.submit(&mut conn, &heart_rate(USER, ts, bpm)).unwrap();
    }

    assert_eq!(process_batch(&mut conn, &cfg(), &mut failures).unwrap(), 3);

    let hourly = rollup::get_hourly(&mut conn, USER, MetricType::HeartRate, hour)
        .unwrap()
        .expect("hourly row");
    let stats = hourly.stats().unwrap();
    assert_eq!(stats.sample_count, 3);
    assert_eq!(stats.average_value, 76.0);
    assert_eq!(stats.min_value, 72.0);
    assert_eq!(stats.max_value, 80.0);

    // one more sample in the same hour: the same rows are updated via
    // re-reduction, not incremented in place
    let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, 55, 0).unwrap();
    store.submit(&mut conn, &heart_rate(USER, ts, 90.0)).unwrap();
    assert_eq!(process_batch(&mut conn, &cfg(), &mut failures).unwrap(), 1);

    let stats = rollup::get_hourly(&mut conn, USER, MetricType::HeartRate, hour)
        .unwrap()
        .expect("hourly row")
        .stats()
        .unwrap();
    assert_eq!(stats.sample_count, 4);
    assert_eq!(stats.average_value, 79.5);
    assert_eq!(stats.max_value, 90.0);

    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let next = date.checked_add_days(Days::new(1)).unwrap();
    let daily = rollup::daily_range(&mut conn, USER, MetricType::HeartRate, date, next).unwrap();
    assert_eq!(daily.len(), 1);
    let day = daily[0].stats().unwrap();
    assert_eq!(day.sample_count, 4);
    assert_eq!(day.average_value, 79.5);
    assert_eq!(day.min_value, 72.0);
    assert_eq!(day.max_value, 90.0);

    let weekly =
        rollup::weekly_range(&mut conn, USER, MetricType::HeartRate, date, next).unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].week_start, "2025-03-10");
    assert_eq!(weekly[0].stats().unwrap().sample_count, 4);
    assert_eq!(weekly[0].stats().unwrap().average_value, 79.5);

    let monthly =
        rollup::monthly_range(&mut conn, USER, MetricType::HeartRate, (2025, 3), (2025, 3))
            .unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].stats().unwrap().sample_count, 4);
    assert_eq!(monthly[0].stats().unwrap().max_value, 90.0);
}

#[test]
fn summable_metric_totals_cascade() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    // two hours of steps on the same day, plus one on the next day
    let day1_h8 = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
    let day1_h9 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let day2_h8 = Utc.with_ymd_and_hms(2025, 3, 11, 8, 0, 0).unwrap();
    for (start, n) in [(day1_h8, 1000.0), (day1_h9, 2000.0), (day2_h8, 500.0)] {
        let end = start + chrono::Duration::minutes(30);
        store.submit(&mut conn, &steps(USER, start, end, n)).unwrap();
    }

    assert_eq!(process_batch(&mut conn, &cfg(), &mut failures).unwrap(), 3);

    let d1 = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let d3 = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    let days = rollup::daily_range(&mut conn, USER, MetricType::Steps, d1, d3).unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].stats().unwrap().total_value, 3000.0);
    assert_eq!(days[0].stats().unwrap().sample_count, 2);
    assert_eq!(days[1].stats().unwrap().total_value, 500.0);

    // both days fall in the week of Monday 2025-03-10
    let weekly = rollup::weekly_range(
        &mut conn,
        USER,
        MetricType::Steps,
        d1,
        d1.checked_add_days(Days::new(1)).unwrap(),
    )
    .unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].stats().unwrap().total_value, 3500.0);

    let monthly =
        rollup::monthly_range(&mut conn, USER, MetricType::Steps, (2025, 3), (2025, 3)).unwrap();
    assert_eq!(monthly[0].stats().unwrap().total_value, 3500.0);
}

#[test]
fn workout_breakdown_reaches_the_daily_rollup() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    let run_start = Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap();
    let swim_start = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();
    store
        .submit(
            &mut conn,
            &workout(USER, run_start, run_start + chrono::Duration::minutes(30), "Running"),
        )
        .unwrap();
    store
        .submit(
            &mut conn,
            &workout(USER, swim_start, swim_start + chrono::Duration::minutes(20), "swim"),
        )
        .unwrap();

    process_batch(&mut conn, &cfg(), &mut failures).unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let days = rollup::daily_range(
        &mut conn,
        USER,
        MetricType::Workout,
        date,
        date.checked_add_days(Days::new(1)).unwrap(),
    )
    .unwrap();
    let day = days[0].stats().unwrap();
    assert_eq!(day.duration_minutes, 50.0);
    let breakdown = day.workout_breakdown.expect("breakdown");
    assert_eq!(breakdown["running"], 30.0);
    assert_eq!(breakdown["swim"], 20.0);
}

#[test]
fn concurrent_style_claims_are_disjoint() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();

    let base = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
    for i in 0..10 {
        let ts = base + chrono::Duration::minutes(i);
        store.submit(&mut conn, &heart_rate(USER, ts, 70.0 + i as f64)).unwrap();
    }

    let a = store.claim_pending(&mut conn, 4).unwrap();
    let b = store.claim_pending(&mut conn, 4).unwrap();
    let c = store.claim_pending(&mut conn, 4).unwrap();
    assert_eq!((a.len(), b.len(), c.len()), (4, 4, 2));

    let mut seen = HashSet::new();
    for row in a.iter().chain(&b).chain(&c) {
        assert!(seen.insert(row.id), "row {} claimed twice", row.id);
        assert_eq!(row.aggregation_status, "processing");
    }
    assert_eq!(seen.len(), 10);

    // nothing pending is left behind
    assert!(store.claim_pending(&mut conn, 4).unwrap().is_empty());
}

#[test]
fn rerunning_aggregation_changes_nothing() {
    let (_db, mut conn) = setup_db();
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    let hour = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
    for (minute, bpm) in [(5, 72.0), (20, 80.0)] {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, minute, 0).unwrap();
        store.submit(&mut conn, &heart_rate(USER, ts, bpm)).unwrap();
    }

    process_batch(&mut conn, &cfg(), &mut failures).unwrap();
    let first = rollup::get_hourly(&mut conn, USER, MetricType::HeartRate, hour)
        .unwrap()
        .unwrap()
        .stats()
        .unwrap();

    // the queue is drained, so another pass claims nothing and rewrites
    // nothing
    assert_eq!(process_batch(&mut conn, &cfg(), &mut failures).unwrap(), 0);
    let second = rollup::get_hourly(&mut conn, USER, MetricType::HeartRate, hour)
        .unwrap()
        .unwrap()
        .stats()
        .unwrap();
    assert_eq!(first, second);

    // resubmitting the identical samples dedups to nothing as well
    for (minute, bpm) in [(5, 72.0), (20, 80.0)] {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 14, minute, 0).unwrap();
        store.submit(&mut conn, &heart_rate(USER, ts, bpm)).unwrap();
    }
    assert_eq!(process_batch(&mut conn, &cfg(), &mut failures).unwrap(), 0);
}
