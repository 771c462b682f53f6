//! UTC bucket mapping for the four rollup granularities.
//!
//! - Hour: clock-hour truncation.
//! - Day: UTC calendar date.
//! - Week: Monday 00:00:00Z aligned.
//! - Month: calendar (year, month).
//!
//! A sample whose window spans a bucket boundary (sleep crossing midnight)
//! is attributed to the bucket containing its start timestamp. All
//! functions assume the input timestamp is UTC.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Timelike, Utc};

/// Rollup resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    /// UTC clock hour.
    Hour,
    /// UTC calendar day.
    Day,
    /// Monday-based week, UTC.
    Week,
    /// Calendar month, UTC.
    Month,
}

/// Truncate a timestamp to the start of its clock hour.
pub fn hour_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), 0, 0)
        .single()
        .expect("hour truncation of a valid UTC timestamp")
}

/// Exclusive end of the hour bucket starting at `start`.
pub fn hour_end_exclusive(start: DateTime<Utc>) -> DateTime<Utc> {
    start + chrono::Duration::hours(1)
}

/// The UTC calendar date a timestamp falls on.
pub fn date_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Half-open UTC bounds [00:00, next 00:00) of a date.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"));
    (start, start + chrono::Duration::days(1))
}

/// The Monday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(back))
        .expect("week start of a valid date")
}

/// Half-open date bounds [monday, next monday) of the week starting at
/// `monday`.
pub fn week_bounds(monday: NaiveDate) -> (NaiveDate, NaiveDate) {
    (
        monday,
        monday.checked_add_days(Days::new(7)).expect("next monday"),
    )
}

/// The (year, month) key of the month containing `date`.
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Half-open date bounds [first of month, first of next month).
pub fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).expect("first of month");
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(ny, nm, 1).expect("first of next month");
    (start, end)
}
