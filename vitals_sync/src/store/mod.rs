//! Raw sample store: dedup insert, atomic claim, lifecycle marks.
//!
//! ## Dedup
//! Upstream sources routinely resend overlapping windows, so a duplicate
//! submission is a normal outcome, not an error: the insert targets the
//! unique natural key and a conflict is reported as
//! [`SubmitOutcome::Duplicate`].
//!
//! ## Claim
//! `claim_pending` is the one place where cross-process concurrency is
//! real (multiple workers, or worker + repair script). It flips up to
//! `limit` pending rows to `processing` and returns them in a single
//! `UPDATE .. RETURNING` statement, so two claimants can never receive
//! overlapping row sets.

mod models;
mod repo;

pub use models::RawVitalRow;
pub use repo::SqliteVitalStore;

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use vitals_core::sample::VitalSample;

/// Errors surfaced by the raw store beyond plain query failures.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A persisted row no longer parses into a domain sample. Such rows
    /// are poison for the aggregator and get quarantined.
    #[error("raw row {id} is malformed: {reason}")]
    MalformedRow {
        /// Row id of the offending sample.
        id: i32,
        /// Human-readable parse failure.
        reason: String,
    },
}

/// Result type used throughout the store for fallible operations.
pub type StoreResult<T> = anyhow::Result<T>;

/// Outcome of a single sample submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new raw row was created with status `pending`.
    Inserted,
    /// The natural key already existed; the submission was a no-op.
    Duplicate,
}

/// Counts for a batch submission.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows newly created.
    pub inserted: usize,
    /// Submissions collapsed by the dedup key.
    pub duplicates: usize,
}

/// Portable surface; the SQLite implementation lives in `repo.rs`.
pub trait RawVitalStore {
    /// Insert one sample; a dedup-key conflict reports `Duplicate`.
    fn submit(
        &self,
        conn: &mut SqliteConnection,
        sample: &VitalSample,
    ) -> StoreResult<SubmitOutcome>;

    /// Insert a batch inside one immediate transaction.
    fn submit_batch(
        &self,
        conn: &mut SqliteConnection,
        samples: &[VitalSample],
    ) -> StoreResult<IngestReport>;

    /// Atomically flip up to `limit` pending rows to `processing` and
    /// return them. Disjoint across concurrent claimants.
    fn claim_pending(
        &self,
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> StoreResult<Vec<RawVitalRow>>;

    /// Transition claimed rows to `completed` and stamp `aggregated_at`.
    fn mark_completed(
        &self,
        conn: &mut SqliteConnection,
        ids: &[i32],
        aggregated_at: DateTime<Utc>,
    ) -> StoreResult<usize>;

    /// Return claimed rows to `pending` for a later retry.
    fn release_to_pending(&self, conn: &mut SqliteConnection, ids: &[i32]) -> StoreResult<usize>;

    /// Park rows as `failed` so they are never claimed again.
    fn quarantine(&self, conn: &mut SqliteConnection, ids: &[i32]) -> StoreResult<usize>;

    /// Startup recovery: flip rows a crashed pass left in `processing`
    /// back to `pending`. Returns how many rows were reverted.
    fn recover_stuck_processing(&self, conn: &mut SqliteConnection) -> StoreResult<usize>;
}
