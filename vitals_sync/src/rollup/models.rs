//! Row structs for the four rollup tables.
//!
//! The statistical columns are identical across granularities; only the
//! period key differs. `sources_included` and `workout_breakdown` are
//! JSON TEXT columns reusing the serde encodings from `vitals_core`.

use std::collections::BTreeSet;

use anyhow::Context;
use diesel::prelude::*;
use indexmap::IndexMap;
use vitals_core::aggregate::PeriodStats;
use vitals_core::metric::DataSource;

use crate::schema::{daily_vitals, hourly_vitals, monthly_vitals, weekly_vitals};

/// One hourly rollup row.
#[derive(Debug, Clone, Queryable)]
pub struct HourlyRow {
    /// Row id.
    pub id: i32,
    /// Owner.
    pub user_id: i64,
    /// Metric code.
    pub metric_type: String,
    /// Hour bucket start, RFC-3339 UTC.
    pub hour_start: String,
    /// Sum of sample values in the period.
    pub total_value: f64,
    /// Mean per sample, recomputed every pass.
    pub average_value: f64,
    /// Smallest sample value.
    pub min_value: f64,
    /// Largest sample value.
    pub max_value: f64,
    /// Raw samples folded into the period.
    pub sample_count: i64,
    /// Accumulated minutes for duration metrics.
    pub duration_minutes: f64,
    /// Unit of the values.
    pub unit: String,
    /// Source contributing the most samples.
    pub primary_source: String,
    /// JSON array of contributing source codes.
    pub sources_included: String,
    /// JSON map sub-type -> minutes, when present.
    pub workout_breakdown: Option<String>,
}

/// One daily rollup row. See [`HourlyRow`] for the stat columns.
#[derive(Debug, Clone, Queryable)]
pub struct DailyRow {
    /// Row id.
    pub id: i32,
    /// Owner.
    pub user_id: i64,
    /// Metric code.
    pub metric_type: String,
    /// ISO date of the day.
    pub date: String,
    /// Sum of sample values.
    pub total_value: f64,
    /// Mean per sample.
    pub average_value: f64,
    /// Smallest sample value.
    pub min_value: f64,
    /// Largest sample value.
    pub max_value: f64,
    /// Raw samples folded in.
    pub sample_count: i64,
    /// Accumulated minutes for duration metrics.
    pub duration_minutes: f64,
    /// Unit of the values.
    pub unit: String,
    /// Source contributing the most samples.
    pub primary_source: String,
    /// JSON array of contributing source codes.
    pub sources_included: String,
    /// JSON map sub-type -> minutes, when present.
    pub workout_breakdown: Option<String>,
}

/// One weekly rollup row. See [`HourlyRow`] for the stat columns.
#[derive(Debug, Clone, Queryable)]
pub struct WeeklyRow {
    /// Row id.
    pub id: i32,
    /// Owner.
    pub user_id: i64,
    /// Metric code.
    pub metric_type: String,
    /// ISO date of the Monday starting the week.
    pub week_start: String,
    /// Sum of sample values.
    pub total_value: f64,
    /// Mean per sample.
    pub average_value: f64,
    /// Smallest sample value.
    pub min_value: f64,
    /// Largest sample value.
    pub max_value: f64,
    /// Raw samples folded in.
    pub sample_count: i64,
    /// Accumulated minutes for duration metrics.
    pub duration_minutes: f64,
    /// Unit of the values.
    pub unit: String,
    /// Source contributing the most samples.
    pub primary_source: String,
    /// JSON array of contributing source codes.
    pub sources_included: String,
    /// JSON map sub-type -> minutes, when present.
    pub workout_breakdown: Option<String>,
}

/// One monthly rollup row. See [`HourlyRow`] for the stat columns.
#[derive(Debug, Clone, Queryable)]
pub struct MonthlyRow {
    /// Row id.
    pub id: i32,
    /// Owner.
    pub user_id: i64,
    /// Metric code.
    pub metric_type: String,
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1..=12.
    pub month: i32,
    /// Sum of sample values.
    pub total_value: f64,
    /// Mean per sample.
    pub average_value: f64,
    /// Smallest sample value.
    pub min_value: f64,
    /// Largest sample value.
    pub max_value: f64,
    /// Raw samples folded in.
    pub sample_count: i64,
    /// Accumulated minutes for duration metrics.
    pub duration_minutes: f64,
    /// Unit of the values.
    pub unit: String,
    /// Source contributing the most samples.
    pub primary_source: String,
    /// JSON array of contributing source codes.
    pub sources_included: String,
    /// JSON map sub-type -> minutes, when present.
    pub workout_breakdown: Option<String>,
}

impl HourlyRow {
    /// Decode the statistical columns back into [`PeriodStats`].
    pub fn stats(&self) -> anyhow::Result<PeriodStats> {
        decode_stats(
            self.total_value,
            self.average_value,
            self.min_value,
            self.max_value,
            self.sample_count,
            self.duration_minutes,
            &self.unit,
            &self.primary_source,
            &self.sources_included,
            self.workout_breakdown.as_deref(),
        )
    }
}

impl DailyRow {
    /// Decode the statistical columns back into [`PeriodStats`].
    pub fn stats(&self) -> anyhow::Result<PeriodStats> {
        decode_stats(
            self.total_value,
            self.average_value,
            self.min_value,
            self.max_value,
            self.sample_count,
            self.duration_minutes,
            &self.unit,
            &self.primary_source,
            &self.sources_included,
            self.workout_breakdown.as_deref(),
        )
    }
}

impl WeeklyRow {
    /// Decode the statistical columns back into [`PeriodStats`].
    pub fn stats(&self) -> anyhow::Result<PeriodStats> {
        decode_stats(
            self.total_value,
            self.average_value,
            self.min_value,
            self.max_value,
            self.sample_count,
            self.duration_minutes,
            &self.unit,
            &self.primary_source,
            &self.sources_included,
            self.workout_breakdown.as_deref(),
        )
    }
}

impl MonthlyRow {
    /// Decode the statistical columns back into [`PeriodStats`].
    pub fn stats(&self) -> anyhow::Result<PeriodStats> {
        decode_stats(
            self.total_value,
            self.average_value,
            self.min_value,
            self.max_value,
            self.sample_count,
            self.duration_minutes,
            &self.unit,
            &self.primary_source,
            &self.sources_included,
            self.workout_breakdown.as_deref(),
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_stats(
    total_value: f64,
    average_value: f64,
    min_value: f64,
    max_value: f64,
    sample_count: i64,
    duration_minutes: f64,
    unit: &str,
    primary_source: &str,
    sources_included: &str,
    workout_breakdown: Option<&str>,
) -> anyhow::Result<PeriodStats> {
    let primary = DataSource::from_code(primary_source)?;
    let sources: BTreeSet<DataSource> =
        serde_json::from_str(sources_included).context("sources_included JSON")?;
    let breakdown: Option<IndexMap<String, f64>> = workout_breakdown
        .map(serde_json::from_str)
        .transpose()
        .context("workout_breakdown JSON")?;

    Ok(PeriodStats {
        total_value,
        average_value,
        min_value,
        max_value,
        sample_count,
        duration_minutes,
        unit: unit.to_string(),
        primary_source: primary,
        sources_included: sources,
        workout_breakdown: breakdown,
    })
}

/// Statistical column values shared by every upsert struct.
pub(crate) struct StatValues {
    pub(crate) total_value: f64,
    pub(crate) average_value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) sample_count: i64,
    pub(crate) duration_minutes: f64,
    pub(crate) unit: String,
    pub(crate) primary_source: &'static str,
    pub(crate) sources_included: String,
    pub(crate) workout_breakdown: Option<String>,
}

pub(crate) fn encode_stats(stats: &PeriodStats) -> anyhow::Result<StatValues> {
    Ok(StatValues {
        total_value: stats.total_value,
        average_value: stats.average_value,
        min_value: stats.min_value,
        max_value: stats.max_value,
        sample_count: stats.sample_count,
        duration_minutes: stats.duration_minutes,
        unit: stats.unit.clone(),
        primary_source: stats.primary_source.as_code(),
        sources_included: serde_json::to_string(&stats.sources_included)
            .context("sources_included JSON")?,
        workout_breakdown: stats
            .workout_breakdown
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("workout_breakdown JSON")?,
    })
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = hourly_vitals)]
pub(crate) struct HourlyUpsert {
    pub(crate) user_id: i64,
    pub(crate) metric_type: &'static str,
    pub(crate) hour_start: String,
    pub(crate) total_value: f64,
    pub(crate) average_value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) sample_count: i64,
    pub(crate) duration_minutes: f64,
    pub(crate) unit: String,
    pub(crate) primary_source: &'static str,
    pub(crate) sources_included: String,
    pub(crate) workout_breakdown: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = daily_vitals)]
pub(crate) struct DailyUpsert {
    pub(crate) user_id: i64,
    pub(crate) metric_type: &'static str,
    pub(crate) date: String,
    pub(crate) total_value: f64,
    pub(crate) average_value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) sample_count: i64,
    pub(crate) duration_minutes: f64,
    pub(crate) unit: String,
    pub(crate) primary_source: &'static str,
    pub(crate) sources_included: String,
    pub(crate) workout_breakdown: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = weekly_vitals)]
pub(crate) struct WeeklyUpsert {
    pub(crate) user_id: i64,
    pub(crate) metric_type: &'static str,
    pub(crate) week_start: String,
    pub(crate) total_value: f64,
    pub(crate) average_value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) sample_count: i64,
    pub(crate) duration_minutes: f64,
    pub(crate) unit: String,
    pub(crate) primary_source: &'static str,
    pub(crate) sources_included: String,
    pub(crate) workout_breakdown: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = monthly_vitals)]
pub(crate) struct MonthlyUpsert {
    pub(crate) user_id: i64,
    pub(crate) metric_type: &'static str,
    pub(crate) year: i32,
    pub(crate) month: i32,
    pub(crate) total_value: f64,
    pub(crate) average_value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) sample_count: i64,
    pub(crate) duration_minutes: f64,
    pub(crate) unit: String,
    pub(crate) primary_source: &'static str,
    pub(crate) sources_included: String,
    pub(crate) workout_breakdown: Option<String>,
}

impl HourlyUpsert {
    pub(crate) fn new(
        user_id: i64,
        metric_type: &'static str,
        hour_start: String,
        v: StatValues,
    ) -> Self {
        Self {
            user_id,
            metric_type,
            hour_start,
            total_value: v.total_value,
            average_value: v.average_value,
            min_value: v.min_value,
            max_value: v.max_value,
            sample_count: v.sample_count,
            duration_minutes: v.duration_minutes,
            unit: v.unit,
            primary_source: v.primary_source,
            sources_included: v.sources_included,
            workout_breakdown: v.workout_breakdown,
        }
    }
}

impl DailyUpsert {
    pub(crate) fn new(
        user_id: i64,
        metric_type: &'static str,
        date: String,
        v: StatValues,
    ) -> Self {
        Self {
            user_id,
            metric_type,
            date,
            total_value: v.total_value,
            average_value: v.average_value,
            min_value: v.min_value,
            max_value: v.max_value,
            sample_count: v.sample_count,
            duration_minutes: v.duration_minutes,
            unit: v.unit,
            primary_source: v.primary_source,
            sources_included: v.sources_included,
            workout_breakdown: v.workout_breakdown,
        }
    }
}

impl WeeklyUpsert {
    pub(crate) fn new(
        user_id: i64,
        metric_type: &'static str,
        week_start: String,
        v: StatValues,
    ) -> Self {
        Self {
            user_id,
            metric_type,
            week_start,
            total_value: v.total_value,
            average_value: v.average_value,
            min_value: v.min_value,
            max_value: v.max_value,
            sample_count: v.sample_count,
            duration_minutes: v.duration_minutes,
            unit: v.unit,
            primary_source: v.primary_source,
            sources_included: v.sources_included,
            workout_breakdown: v.workout_breakdown,
        }
    }
}

impl MonthlyUpsert {
    pub(crate) fn new(
        user_id: i64,
        metric_type: &'static str,
        year: i32,
        month: i32,
        v: StatValues,
    ) -> Self {
        Self {
            user_id,
            metric_type,
            year,
            month,
            total_value: v.total_value,
            average_value: v.average_value,
            min_value: v.min_value,
            max_value: v.max_value,
            sample_count: v.sample_count,
            duration_minutes: v.duration_minutes,
            unit: v.unit,
            primary_source: v.primary_source,
            sources_included: v.sources_included,
            workout_breakdown: v.workout_breakdown,
        }
    }
}
