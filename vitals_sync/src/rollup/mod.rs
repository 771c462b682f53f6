//! Rollup repositories and the aggregate read API.
//!
//! One table per granularity, each keyed by (user_id, metric_type,
//! period). The aggregator is the only writer and always goes through the
//! upserts here; dashboards and the scoring engine use the range reads,
//! which never trigger aggregation.

mod models;
mod repo;

pub use models::{DailyRow, HourlyRow, MonthlyRow, WeeklyRow};
pub use repo::{
    daily_on, daily_range, get_hourly, hourly_for_date, hourly_range, monthly_range,
    upsert_daily, upsert_hourly, upsert_monthly, upsert_weekly, weekly_range,
};
