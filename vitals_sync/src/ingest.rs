//! Ingestion boundary: the one write entry point the outside world calls.
//!
//! Submission is synchronous from the caller's perspective but
//! fire-and-forget with respect to aggregation: the dedup insert commits
//! and returns immediately, and the rollups catch up once the scheduler's
//! cooldown elapses.
//!
//! Bulk callers chunk their upload and pass [`ChunkInfo`] so the gate can
//! hold the worker back until the final chunk lands (and then apply the
//! long bulk cooldown instead of the incremental one).

use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vitals_core::sample::VitalSample;

use crate::activity::SyncActivityTracker;
use crate::scheduler::{AggregationScheduler, IngestKind};
use crate::store::{IngestReport, RawVitalStore, SqliteVitalStore};

/// Position of a submission inside a chunked bulk upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Caller-chosen id shared by every chunk of one upload.
    pub session_id: String,
    /// 1-based index of this chunk.
    pub chunk_number: u32,
    /// Total chunks the caller intends to send.
    pub total_chunks: u32,
    /// Marks the last chunk; ends the sync operation.
    pub is_final_chunk: bool,
}

/// Submit a batch of samples.
///
/// Duplicates (by the natural key) are collapsed silently and counted in
/// the report; the caller never sees an error for a resent window. The
/// first chunk of a session registers a sync operation, the final chunk
/// ends it and queues a bulk-cooldown gate check; chunkless submissions
/// queue an incremental-cooldown check.
pub fn submit_samples(
    conn: &mut SqliteConnection,
    tracker: &SyncActivityTracker,
    scheduler: &AggregationScheduler,
    user_id: i64,
    samples: &[VitalSample],
    chunk: Option<&ChunkInfo>,
) -> anyhow::Result<IngestReport> {
    if let Some(info) = chunk {
        if info.chunk_number <= 1 {
            tracker.start(user_id, &info.session_id);
        }
    }

    let store = SqliteVitalStore::new();
    let report = store.submit_batch(conn, samples)?;
    tracker.note_activity();

    match chunk {
        Some(info) if info.is_final_chunk => {
            tracker.end(user_id, &info.session_id);
            scheduler.schedule_reevaluation(IngestKind::Bulk);
        }
        // mid-backfill chunk: the operation stays active and keeps the
        // gate closed, nothing to schedule yet
        Some(_) => {}
        None => scheduler.schedule_reevaluation(IngestKind::Incremental),
    }

    debug!(
        user_id,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "samples submitted"
    );
    Ok(report)
}

/// Explicitly end a sync operation outside the chunk flow, e.g. when a
/// caller abandons an upload session. Re-stamps activity and queues a
/// bulk-cooldown gate check, exactly like a final chunk.
pub fn end_sync_operation(
    tracker: &SyncActivityTracker,
    scheduler: &AggregationScheduler,
    user_id: i64,
    session_id: &str,
) {
    tracker.end(user_id, session_id);
    scheduler.schedule_reevaluation(IngestKind::Bulk);
}
