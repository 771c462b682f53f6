//! In-memory registry of in-flight bulk-ingest operations.
//!
//! The ingestion boundary brackets every chunked upload with
//! [`SyncActivityTracker::start`] / [`SyncActivityTracker::end`] and
//! stamps plain submissions with [`SyncActivityTracker::note_activity`].
//! The scheduler consults the tracker to decide whether the aggregation
//! worker may start.
//!
//! The last-activity stamp is global, not per-user: one user's heavy
//! backfill delays the shared worker's restart for everyone. That is
//! acceptable because the worker drains every user's pending rows in one
//! pass, not just the active user's.
//!
//! Nothing here is persisted; a process restart forgets all operations.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks which users currently have bulk-ingest operations in flight.
///
/// Shared across request handlers behind an `Arc`; both maps are
/// mutex-guarded, so concurrent handlers cannot race.
#[derive(Debug, Default)]
pub struct SyncActivityTracker {
    ops: Mutex<HashMap<i64, HashSet<String>>>,
    last_activity: Mutex<Option<Instant>>,
}

impl SyncActivityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation for a user and stamp last activity.
    pub fn start(&self, user_id: i64, operation_id: &str) {
        let mut ops = self.ops.lock().expect("tracker ops lock");
        ops.entry(user_id)
            .or_default()
            .insert(operation_id.to_string());
        drop(ops);
        self.note_activity();
    }

    /// Remove an operation and re-stamp last activity. Returns whether
    /// the operation was actually registered (duplicate end calls from a
    /// retried final chunk are tolerated as no-ops).
    pub fn end(&self, user_id: i64, operation_id: &str) -> bool {
        let mut ops = self.ops.lock().expect("tracker ops lock");
        let removed = match ops.get_mut(&user_id) {
            Some(set) => {
                let removed = set.remove(operation_id);
                if set.is_empty() {
                    ops.remove(&user_id);
                }
                removed
            }
            None => false,
        };
        drop(ops);
        self.note_activity();
        removed
    }

    /// Stamp "last activity now" without touching the operation set.
    pub fn note_activity(&self) {
        *self.last_activity.lock().expect("tracker activity lock") = Some(Instant::now());
    }

    /// True if any user has a non-empty operation set.
    pub fn has_active_operations(&self) -> bool {
        !self.ops.lock().expect("tracker ops lock").is_empty()
    }

    /// Number of in-flight operations across all users.
    pub fn active_operation_count(&self) -> usize {
        self.ops
            .lock()
            .expect("tracker ops lock")
            .values()
            .map(HashSet::len)
            .sum()
    }

    /// Elapsed time since the most recent start/end/submission across all
    /// users, or `None` if nothing was ever recorded.
    pub fn time_since_last_activity(&self) -> Option<Duration> {
        self.last_activity
            .lock()
            .expect("tracker activity lock")
            .map(|at| at.elapsed())
    }
}
