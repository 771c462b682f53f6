use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use vitals_core::aggregate::PeriodStats;
use vitals_core::metric::MetricType;
use vitals_core::time;

use crate::rollup::models::{
    DailyRow, DailyUpsert, HourlyRow, HourlyUpsert, MonthlyRow, MonthlyUpsert, WeeklyRow,
    WeeklyUpsert, encode_stats,
};
use crate::schema::{daily_vitals, hourly_vitals, monthly_vitals, weekly_vitals};

/// Load the hourly row for one (user, metric, hour) bucket, if present.
pub fn get_hourly(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    hour_start: DateTime<Utc>,
) -> anyhow::Result<Option<HourlyRow>> {
    use crate::schema::hourly_vitals::dsl as hv;

    let key = time::to_rfc3339_millis(hour_start);
    let row = hv::hourly_vitals
        .filter(
            hv::user_id
                .eq(user)
                .and(hv::metric_type.eq(metric.as_code()))
                .and(hv::hour_start.eq(key)),
        )
        .first::<HourlyRow>(conn)
        .optional()?;
    Ok(row)
}

/// Insert-or-update the hourly row for one (user, metric, hour) bucket.
pub fn upsert_hourly(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    hour_start: DateTime<Utc>,
    stats: &PeriodStats,
) -> anyhow::Result<()> {
    use crate::schema::hourly_vitals::dsl as hv;

    let row = HourlyUpsert::new(
        user,
        metric.as_code(),
        time::to_rfc3339_millis(hour_start),
        encode_stats(stats)?,
    );
    diesel::insert_into(hourly_vitals::table)
        .values(&row)
        .on_conflict((hv::user_id, hv::metric_type, hv::hour_start))
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

/// All hourly rows of one (user, metric) on a given UTC date, in hour
/// order. This is the input to the daily re-reduction.
pub fn hourly_for_date(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    date: NaiveDate,
) -> anyhow::Result<Vec<HourlyRow>> {
    let (start, end) = vitals_core::bucket::day_bounds(date);
    hourly_range(conn, user, metric, start, end)
}

/// Hourly rows of one (user, metric) in the half-open window `[from, to)`.
pub fn hourly_range(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> anyhow::Result<Vec<HourlyRow>> {
    use crate::schema::hourly_vitals::dsl as hv;

    let rows = hv::hourly_vitals
        .filter(
            hv::user_id
                .eq(user)
                .and(hv::metric_type.eq(metric.as_code()))
                .and(hv::hour_start.ge(time::to_rfc3339_millis(from)))
                .and(hv::hour_start.lt(time::to_rfc3339_millis(to))),
        )
        .order(hv::hour_start.asc())
        .load::<HourlyRow>(conn)?;
    Ok(rows)
}

/// Insert-or-update the daily row for one (user, metric, date).
pub fn upsert_daily(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    date: NaiveDate,
    stats: &PeriodStats,
) -> anyhow::Result<()> {
    use crate::schema::daily_vitals::dsl as dv;

    let row = DailyUpsert::new(
        user,
        metric.as_code(),
        time::date_str(date),
        encode_stats(stats)?,
    );
    diesel::insert_into(daily_vitals::table)
        .values(&row)
        .on_conflict((dv::user_id, dv::metric_type, dv::date))
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

/// Daily rows of one (user, metric) in the half-open date window
/// `[from, to)`, in date order. ISO dates sort lexicographically, so the
/// TEXT comparison is chronological.
pub fn daily_range(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<DailyRow>> {
    use crate::schema::daily_vitals::dsl as dv;

    let rows = dv::daily_vitals
        .filter(
            dv::user_id
                .eq(user)
                .and(dv::metric_type.eq(metric.as_code()))
                .and(dv::date.ge(time::date_str(from)))
                .and(dv::date.lt(time::date_str(to))),
        )
        .order(dv::date.asc())
        .load::<DailyRow>(conn)?;
    Ok(rows)
}

/// Daily rows for every user on one date; the cross-user scan behind the
/// scoring engine, served by the secondary index on `date`.
pub fn daily_on(conn: &mut SqliteConnection, date: NaiveDate) -> anyhow::Result<Vec<DailyRow>> {
    use crate::schema::daily_vitals::dsl as dv;

    let rows = dv::daily_vitals
        .filter(dv::date.eq(time::date_str(date)))
        .order((dv::user_id.asc(), dv::metric_type.asc()))
        .load::<DailyRow>(conn)?;
    Ok(rows)
}

/// Insert-or-update the weekly row for one (user, metric, week).
pub fn upsert_weekly(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    week_start: NaiveDate,
    stats: &PeriodStats,
) -> anyhow::Result<()> {
    use crate::schema::weekly_vitals::dsl as wv;

    let row = WeeklyUpsert::new(
        user,
        metric.as_code(),
        time::date_str(week_start),
        encode_stats(stats)?,
    );
    diesel::insert_into(weekly_vitals::table)
        .values(&row)
        .on_conflict((wv::user_id, wv::metric_type, wv::week_start))
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

/// Weekly rows of one (user, metric) whose week starts in `[from, to)`.
pub fn weekly_range(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<WeeklyRow>> {
    use crate::schema::weekly_vitals::dsl as wv;

    let rows = wv::weekly_vitals
        .filter(
            wv::user_id
                .eq(user)
                .and(wv::metric_type.eq(metric.as_code()))
                .and(wv::week_start.ge(time::date_str(from)))
                .and(wv::week_start.lt(time::date_str(to))),
        )
        .order(wv::week_start.asc())
        .load::<WeeklyRow>(conn)?;
    Ok(rows)
}

/// Insert-or-update the monthly row for one (user, metric, year, month).
pub fn upsert_monthly(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    year: i32,
    month: u32,
    stats: &PeriodStats,
) -> anyhow::Result<()> {
    use crate::schema::monthly_vitals::dsl as mv;

    let row = MonthlyUpsert::new(user, metric.as_code(), year, month as i32, encode_stats(stats)?);
    diesel::insert_into(monthly_vitals::table)
        .values(&row)
        .on_conflict((mv::user_id, mv::metric_type, mv::year, mv::month))
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

/// Monthly rows of one (user, metric) between two inclusive (year, month)
/// keys.
pub fn monthly_range(
    conn: &mut SqliteConnection,
    user: i64,
    metric: MetricType,
    from: (i32, u32),
    to: (i32, u32),
) -> anyhow::Result<Vec<MonthlyRow>> {
    use crate::schema::monthly_vitals::dsl as mv;

    let (fy, fm) = (from.0, from.1 as i32);
    let (ty, tm) = (to.0, to.1 as i32);
    let rows = mv::monthly_vitals
        .filter(
            mv::user_id
                .eq(user)
                .and(mv::metric_type.eq(metric.as_code()))
                .and(mv::year.gt(fy).or(mv::year.eq(fy).and(mv::month.ge(fm))))
                .and(mv::year.lt(ty).or(mv::year.eq(ty).and(mv::month.le(tm)))),
        )
        .order((mv::year.asc(), mv::month.asc()))
        .load::<MonthlyRow>(conn)?;
    Ok(rows)
}
