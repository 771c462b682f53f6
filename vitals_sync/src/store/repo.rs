use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use vitals_core::metric::AggregationStatus;
use vitals_core::sample::VitalSample;
use vitals_core::time;

use crate::schema::raw_vitals::dsl as rv;
use crate::store::models::{NewRawVital, RawVitalRow};
use crate::store::{IngestReport, RawVitalStore, StoreResult, SubmitOutcome};

/// SQLite-backed raw sample store.
pub struct SqliteVitalStore;

impl SqliteVitalStore {
    /// Create the store handle. Stateless; connections are passed per call.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteVitalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_one(
    conn: &mut SqliteConnection,
    sample: &VitalSample,
    now: &str,
) -> StoreResult<SubmitOutcome> {
    let row = NewRawVital::from_sample(sample, now);

    // INSERT .. ON CONFLICT (dedup key) DO NOTHING: 0 rows affected means
    // the natural key already existed.
    let affected = diesel::insert_into(rv::raw_vitals)
        .values(&row)
        .on_conflict((
            rv::user_id,
            rv::metric_type,
            rv::unit,
            rv::start_ts,
            rv::data_source,
            rv::dedup_note,
        ))
        .do_nothing()
        .execute(conn)?;

    Ok(if affected == 0 {
        SubmitOutcome::Duplicate
    } else {
        SubmitOutcome::Inserted
    })
}

impl RawVitalStore for SqliteVitalStore {
    fn submit(
        &self,
        conn: &mut SqliteConnection,
        sample: &VitalSample,
    ) -> StoreResult<SubmitOutcome> {
        let now = time::to_rfc3339_millis(Utc::now());
        insert_one(conn, sample, &now)
    }

    fn submit_batch(
        &self,
        conn: &mut SqliteConnection,
        samples: &[VitalSample],
    ) -> StoreResult<IngestReport> {
        let now = time::to_rfc3339_millis(Utc::now());

        conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let mut report = IngestReport::default();
            for sample in samples {
                match insert_one(conn, sample, &now)? {
                    SubmitOutcome::Inserted => report.inserted += 1,
                    SubmitOutcome::Duplicate => report.duplicates += 1,
                }
            }
            Ok(report)
        })
    }

    fn claim_pending(
        &self,
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> StoreResult<Vec<RawVitalRow>> {
        let now = time::to_rfc3339_millis(Utc::now());

        // One atomic statement: whoever runs it first owns the rows, a
        // concurrent claimant sees them as 'processing' and skips them.
        let rows = sql_query(
            "UPDATE raw_vitals \
             SET aggregation_status = 'processing', updated_at = ? \
             WHERE id IN (SELECT id FROM raw_vitals \
                          WHERE aggregation_status = 'pending' \
                          ORDER BY id LIMIT ?) \
             RETURNING *",
        )
        .bind::<Text, _>(now)
        .bind::<BigInt, _>(limit)
        .load::<RawVitalRow>(conn)?;

        Ok(rows)
    }

    fn mark_completed(
        &self,
        conn: &mut SqliteConnection,
        ids: &[i32],
        aggregated_at: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let at = time::to_rfc3339_millis(aggregated_at);
        let n = diesel::update(rv::raw_vitals.filter(rv::id.eq_any(ids.iter().copied())))
            .set((
                rv::aggregation_status.eq(AggregationStatus::Completed.as_code()),
                rv::aggregated_at.eq(Some(at.clone())),
                rv::updated_at.eq(at),
            ))
            .execute(conn)?;
        Ok(n)
    }

    fn release_to_pending(&self, conn: &mut SqliteConnection, ids: &[i32]) -> StoreResult<usize> {
        let now = time::to_rfc3339_millis(Utc::now());
        let n = diesel::update(rv::raw_vitals.filter(rv::id.eq_any(ids.iter().copied())))
            .set((
                rv::aggregation_status.eq(AggregationStatus::Pending.as_code()),
                rv::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(n)
    }

    fn quarantine(&self, conn: &mut SqliteConnection, ids: &[i32]) -> StoreResult<usize> {
        let now = time::to_rfc3339_millis(Utc::now());
        let n = diesel::update(rv::raw_vitals.filter(rv::id.eq_any(ids.iter().copied())))
            .set((
                rv::aggregation_status.eq(AggregationStatus::Failed.as_code()),
                rv::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(n)
    }

    fn recover_stuck_processing(&self, conn: &mut SqliteConnection) -> StoreResult<usize> {
        let now = time::to_rfc3339_millis(Utc::now());
        let n = diesel::update(
            rv::raw_vitals.filter(rv::aggregation_status.eq(AggregationStatus::Processing.as_code())),
        )
        .set((
            rv::aggregation_status.eq(AggregationStatus::Pending.as_code()),
            rv::updated_at.eq(now),
        ))
        .execute(conn)?;
        Ok(n)
    }
}
