//! Pure multi-granularity aggregation.
//!
//! Two operations cover the whole rollup pipeline:
//!
//! - [`fold_into_hour`] merges a claimed batch's samples for one
//!   (user, metric, hour) into the pre-existing hourly statistics.
//! - [`reduce_periods`] re-derives a coarser period from the complete set
//!   of next-finer rollups covering it: daily = reduce(hourly in day),
//!   weekly = reduce(daily in week), monthly = reduce(daily in month).
//!
//! Both are deterministic and associative reductions over
//! sum/count/min/max, so re-running them on unchanged inputs reproduces
//! the same rollups. Averages are always recomputed from the running
//! total and count rather than incrementally averaged, which keeps
//! repeated partial updates free of floating-point drift.
//!
//! Neither function performs I/O; the worker supplies the existing rollup
//! state for the affected periods and writes the results back.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::metric::{DataSource, MetricKind, MetricType};
use crate::sample::VitalSample;

/// Statistics for one (user, metric, period) at any granularity.
///
/// The same shape backs all four rollup tables; the period key lives
/// outside this struct, with the row.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    /// Sum of sample values in the period.
    pub total_value: f64,
    /// `total_value / sample_count`; mean per sample.
    pub average_value: f64,
    /// Smallest sample value in the period.
    pub min_value: f64,
    /// Largest sample value in the period.
    pub max_value: f64,
    /// Number of raw samples folded into the period.
    pub sample_count: i64,
    /// Accumulated minutes, for duration metrics; 0 otherwise.
    pub duration_minutes: f64,
    /// Unit of the values; first-seen wins within a period.
    pub unit: String,
    /// The data source contributing the most samples to the period.
    pub primary_source: DataSource,
    /// Union of every source that contributed.
    pub sources_included: BTreeSet<DataSource>,
    /// Minutes by sub-type, for duration metrics whose notes encode one.
    pub workout_breakdown: Option<IndexMap<String, f64>>,
}

/// Merge a batch's samples for a single (user, metric, hour) bucket into
/// the existing hourly statistics for that bucket, if any.
///
/// Returns `None` only when there is nothing to fold (no existing stats
/// and no samples). The existing row contributes its full sample count to
/// its recorded primary source when re-voting `primary_source`; new
/// samples vote individually.
pub fn fold_into_hour(
    metric: MetricType,
    existing: Option<&PeriodStats>,
    samples: &[&VitalSample],
) -> Option<PeriodStats> {
    if existing.is_none() && samples.is_empty() {
        return None;
    }

    let mut votes: BTreeMap<DataSource, i64> = BTreeMap::new();
    let mut acc = match existing {
        Some(prev) => {
            *votes.entry(prev.primary_source).or_insert(0) += prev.sample_count;
            prev.clone()
        }
        None => empty_stats(&samples[0].unit, samples[0].data_source),
    };

    for s in samples {
        acc.total_value += s.value;
        acc.sample_count += 1;
        if acc.sample_count == 1 {
            acc.min_value = s.value;
            acc.max_value = s.value;
        } else {
            acc.min_value = acc.min_value.min(s.value);
            acc.max_value = acc.max_value.max(s.value);
        }
        *votes.entry(s.data_source).or_insert(0) += 1;
        acc.sources_included.insert(s.data_source);

        if metric.kind() == MetricKind::Duration {
            let minutes = s.window_minutes();
            acc.duration_minutes += minutes;
            if let Some(key) = s.breakdown_key() {
                let map = acc.workout_breakdown.get_or_insert_with(IndexMap::new);
                *map.entry(key).or_insert(0.0) += minutes;
            }
        }
    }

    acc.average_value = mean(acc.total_value, acc.sample_count);
    acc.primary_source = pick_primary(&votes, acc.primary_source);
    Some(acc)
}

/// Re-derive a coarser period from the complete set of next-finer rollups
/// covering it. Returns `None` when `finer` is empty (the caller then
/// leaves the coarser row untouched).
pub fn reduce_periods(finer: &[PeriodStats]) -> Option<PeriodStats> {
    let first = finer.first()?;
    let mut votes: BTreeMap<DataSource, i64> = BTreeMap::new();
    let mut acc = empty_stats(&first.unit, first.primary_source);

    for p in finer {
        acc.total_value += p.total_value;
        if acc.sample_count == 0 {
            acc.min_value = p.min_value;
            acc.max_value = p.max_value;
        } else {
            acc.min_value = acc.min_value.min(p.min_value);
            acc.max_value = acc.max_value.max(p.max_value);
        }
        acc.sample_count += p.sample_count;
        acc.duration_minutes += p.duration_minutes;
        *votes.entry(p.primary_source).or_insert(0) += p.sample_count;
        acc.sources_included.extend(p.sources_included.iter().copied());

        if let Some(breakdown) = &p.workout_breakdown {
            let map = acc.workout_breakdown.get_or_insert_with(IndexMap::new);
            for (k, v) in breakdown {
                *map.entry(k.clone()).or_insert(0.0) += v;
            }
        }
    }

    acc.average_value = mean(acc.total_value, acc.sample_count);
    acc.primary_source = pick_primary(&votes, acc.primary_source);
    Some(acc)
}

fn empty_stats(unit: &str, primary: DataSource) -> PeriodStats {
    PeriodStats {
        total_value: 0.0,
        average_value: 0.0,
        min_value: 0.0,
        max_value: 0.0,
        sample_count: 0,
        duration_minutes: 0.0,
        unit: unit.to_string(),
        primary_source: primary,
        sources_included: BTreeSet::new(),
        workout_breakdown: None,
    }
}

fn mean(total: f64, count: i64) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

/// Highest vote wins; ties resolve to the earliest variant in code order
/// so recomputation is stable across passes.
fn pick_primary(votes: &BTreeMap<DataSource, i64>, fallback: DataSource) -> DataSource {
    let mut best = fallback;
    let mut best_votes = i64::MIN;
    for (source, n) in votes {
        if *n > best_votes {
            best = *source;
            best_votes = *n;
        }
    }
    best
}
