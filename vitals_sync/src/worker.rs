//! Background aggregation worker.
//!
//! Runs as its own OS process (see `bin/vitals_worker.rs`) with its own
//! connection, so the serving process's pool is never starved. Each pass:
//! claim a batch of pending rows, fold them into the hourly rollups, then
//! re-reduce every touched daily, weekly, and monthly period from the
//! next-finer granularity, and mark the rows completed. All of that runs
//! inside one immediate transaction, so a crash mid-pass changes nothing
//! and the claimed rows are simply recovered on the next startup.
//!
//! Failure handling: a failed batch is released back to `pending` and an
//! in-memory error counter is bumped per row; rows that keep failing are
//! quarantined as `failed` so a poison pill cannot wedge the loop.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::SqliteConnection;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vitals_core::aggregate::{self, PeriodStats};
use vitals_core::bucket;
use vitals_core::metric::MetricType;
use vitals_core::sample::VitalSample;

use crate::config::WorkerConfig;
use crate::db::connection;
use crate::rollup;
use crate::store::{RawVitalStore, SqliteVitalStore};

/// Per-row consecutive failure counts, held in worker memory only.
pub type FailureCounts = HashMap<i32, u32>;

/// The worker scheduling loop. Blocks until `shutdown` flips to true or
/// a database error makes the pass unrecoverable; either way the caller
/// (the scheduler's drop guard) resets the started flag.
pub fn run_loop(cfg: &WorkerConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let mut conn = connection::connect_sqlite(&cfg.database_url)?;
    let store = SqliteVitalStore::new();
    let mut failures = FailureCounts::new();

    info!(
        batch_size = cfg.batch_size,
        tick_secs = cfg.tick_secs,
        "vitals worker running"
    );

    if cfg.process_pending_on_startup {
        let reclaimed = store.recover_stuck_processing(&mut conn)?;
        if reclaimed > 0 {
            info!(reclaimed, "reverted rows stuck in processing");
        }
        // drain whatever a previous crash left behind before ticking
        while !*shutdown.borrow() {
            if process_batch(&mut conn, cfg, &mut failures)? == 0 {
                break;
            }
        }
    }

    loop {
        if sleep_until_shutdown(&shutdown, cfg.tick()) {
            break;
        }
        process_batch(&mut conn, cfg, &mut failures)?;
    }

    info!("vitals worker shut down");
    Ok(())
}

/// One claim → aggregate → mark pass. Returns how many rows were claimed
/// (0 means the pending queue was empty). Public so repair tooling and
/// the integration tests can drive passes without the loop.
pub fn process_batch(
    conn: &mut SqliteConnection,
    cfg: &WorkerConfig,
    failures: &mut FailureCounts,
) -> anyhow::Result<usize> {
    let store = SqliteVitalStore::new();
    let claimed = store.claim_pending(conn, cfg.batch_size)?;
    if claimed.is_empty() {
        return Ok(0);
    }

    let mut samples: Vec<(i32, VitalSample)> = Vec::with_capacity(claimed.len());
    let mut malformed: Vec<i32> = Vec::new();
    for row in &claimed {
        match row.to_sample() {
            Ok(sample) => samples.push((row.id, sample)),
            Err(e) => {
                warn!(error = %e, "quarantining unreadable row");
                malformed.push(row.id);
            }
        }
    }
    if !malformed.is_empty() {
        store.quarantine(conn, &malformed)?;
    }
    if samples.is_empty() {
        return Ok(claimed.len());
    }

    let ids: Vec<i32> = samples.iter().map(|(id, _)| *id).collect();
    let outcome = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        apply_rollups(conn, &samples)?;
        store.mark_completed(conn, &ids, Utc::now())?;
        Ok(())
    });

    match outcome {
        Ok(()) => {
            for id in &ids {
                failures.remove(id);
            }
            debug!(completed = ids.len(), "batch aggregated");
            Ok(claimed.len())
        }
        Err(e) => {
            warn!(error = %e, rows = ids.len(), "aggregation failed; releasing batch");
            let mut retry = Vec::new();
            let mut poison = Vec::new();
            for id in ids {
                let count = failures.entry(id).or_insert(0);
                *count += 1;
                if *count >= cfg.max_row_failures {
                    poison.push(id);
                } else {
                    retry.push(id);
                }
            }
            if !retry.is_empty() {
                store.release_to_pending(conn, &retry)?;
            }
            if !poison.is_empty() {
                warn!(rows = poison.len(), "quarantining rows after repeated failures");
                store.quarantine(conn, &poison)?;
                for id in &poison {
                    failures.remove(id);
                }
            }
            Ok(claimed.len())
        }
    }
}

/// Fold claimed samples into hourly rollups, then re-reduce every touched
/// coarser period from the next-finer granularity. Daily rows are rebuilt
/// from the full day's hourly rows (not the raw samples), so they stay
/// correct when hourly rows pre-existed from earlier batches; the same
/// rule cascades to weeks and months.
fn apply_rollups(
    conn: &mut SqliteConnection,
    samples: &[(i32, VitalSample)],
) -> anyhow::Result<()> {
    let mut by_hour: BTreeMap<(i64, MetricType, DateTime<Utc>), Vec<&VitalSample>> =
        BTreeMap::new();
    for (_, sample) in samples {
        by_hour
            .entry((
                sample.user_id,
                sample.metric_type,
                bucket::hour_start(sample.start_ts),
            ))
            .or_default()
            .push(sample);
    }

    let mut touched_days: BTreeSet<(i64, MetricType, NaiveDate)> = BTreeSet::new();
    for ((user, metric, hour), group) in &by_hour {
        let existing = match rollup::get_hourly(conn, *user, *metric, *hour)? {
            Some(row) => Some(row.stats()?),
            None => None,
        };
        if let Some(stats) = aggregate::fold_into_hour(*metric, existing.as_ref(), group) {
            rollup::upsert_hourly(conn, *user, *metric, *hour, &stats)?;
        }
        touched_days.insert((*user, *metric, bucket::date_of(*hour)));
    }

    let mut touched_weeks: BTreeSet<(i64, MetricType, NaiveDate)> = BTreeSet::new();
    let mut touched_months: BTreeSet<(i64, MetricType, (i32, u32))> = BTreeSet::new();
    for (user, metric, date) in &touched_days {
        let hours = rollup::hourly_for_date(conn, *user, *metric, *date)?;
        let stats = hours
            .iter()
            .map(|h| h.stats())
            .collect::<anyhow::Result<Vec<PeriodStats>>>()?;
        if let Some(day) = aggregate::reduce_periods(&stats) {
            rollup::upsert_daily(conn, *user, *metric, *date, &day)?;
        }
        touched_weeks.insert((*user, *metric, bucket::week_start(*date)));
        touched_months.insert((*user, *metric, bucket::month_key(*date)));
    }

    for (user, metric, monday) in &touched_weeks {
        let (from, to) = bucket::week_bounds(*monday);
        let days = rollup::daily_range(conn, *user, *metric, from, to)?;
        let stats = days
            .iter()
            .map(|d| d.stats())
            .collect::<anyhow::Result<Vec<PeriodStats>>>()?;
        if let Some(week) = aggregate::reduce_periods(&stats) {
            rollup::upsert_weekly(conn, *user, *metric, *monday, &week)?;
        }
    }

    for (user, metric, (year, month)) in &touched_months {
        let (from, to) = bucket::month_bounds(*year, *month);
        let days = rollup::daily_range(conn, *user, *metric, from, to)?;
        let stats = days
            .iter()
            .map(|d| d.stats())
            .collect::<anyhow::Result<Vec<PeriodStats>>>()?;
        if let Some(month_stats) = aggregate::reduce_periods(&stats) {
            rollup::upsert_monthly(conn, *user, *metric, *year, *month, &month_stats)?;
        }
    }

    Ok(())
}

/// Sleep in short slices so a shutdown signal interrupts the tick
/// promptly. Returns true when shutdown was requested.
fn sleep_until_shutdown(shutdown: &watch::Receiver<bool>, tick: Duration) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = tick;
    while remaining > Duration::ZERO {
        if *shutdown.borrow() {
            return true;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
    *shutdown.borrow()
}
