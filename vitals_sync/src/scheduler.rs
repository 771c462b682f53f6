//! Aggregation gate: decides when the background worker (re)starts.
//!
//! Aggregating after every sample during a multi-thousand-row backfill
//! would recompute the same rollups over and over, so the gate coalesces
//! many ingest events into one pass: the worker may start only when no
//! sync operation is in flight and the configured cooldown has elapsed
//! since the last ingest activity. Bulk imports use a longer cooldown
//! than incremental pushes.
//!
//! The scheduler owns the worker task: an explicit handle plus a shutdown
//! channel, so stopping is deterministic. The `started` flag is reset by
//! a drop guard inside the worker task itself, so a crash or panic can
//! never leave the gate wedged shut (state machine: Idle <-> Running,
//! with every Running exit path flowing through the guard).
//!
//! No module-level state: construct one scheduler per process supervisor
//! and share clones (all fields are behind `Arc`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::activity::SyncActivityTracker;
use crate::config::WorkerConfig;
use crate::worker;

/// Which cooldown an ingest event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    /// Part of a large historical import; long cooldown.
    Bulk,
    /// A live/incremental push; short cooldown.
    Incremental,
}

#[derive(Default)]
struct WorkerTask {
    handle: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

/// Resets the started flag when the worker task exits, however it exits.
struct StartedGuard(Arc<AtomicBool>);

impl Drop for StartedGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Gate and lifecycle owner for the background aggregation worker.
#[derive(Clone)]
pub struct AggregationScheduler {
    tracker: Arc<SyncActivityTracker>,
    cfg: Arc<WorkerConfig>,
    started: Arc<AtomicBool>,
    starts_total: Arc<AtomicU64>,
    task: Arc<Mutex<WorkerTask>>,
    pending_cooldown: Arc<Mutex<Option<Duration>>>,
}

impl AggregationScheduler {
    /// Build a scheduler over the shared activity tracker.
    pub fn new(tracker: Arc<SyncActivityTracker>, cfg: WorkerConfig) -> Self {
        AggregationScheduler {
            tracker,
            cfg: Arc::new(cfg),
            started: Arc::new(AtomicBool::new(false)),
            starts_total: Arc::new(AtomicU64::new(0)),
            task: Arc::new(Mutex::new(WorkerTask::default())),
            pending_cooldown: Arc::new(Mutex::new(None)),
        }
    }

    fn cooldown(&self, kind: IngestKind) -> Duration {
        match kind {
            IngestKind::Bulk => self.cfg.bulk_delay(),
            IngestKind::Incremental => self.cfg.incremental_delay(),
        }
    }

    /// True iff the worker is not running, no sync operation is active,
    /// and the cooldown for `kind` has elapsed since the last activity.
    pub fn should_start(&self, kind: IngestKind) -> bool {
        if self.started.load(Ordering::SeqCst) {
            return false;
        }
        if self.tracker.has_active_operations() {
            return false;
        }
        match self.tracker.time_since_last_activity() {
            Some(elapsed) => elapsed >= self.cooldown(kind),
            None => true,
        }
    }

    /// Whether the worker task is currently running.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// How many times the worker has been started over this scheduler's
    /// lifetime. Operator metric; the debounce tests assert on it.
    pub fn starts_total(&self) -> u64 {
        self.starts_total.load(Ordering::SeqCst)
    }

    /// Spawn the worker task. Idempotent: calling while already started
    /// is a no-op. Must run inside a tokio runtime.
    pub fn start_worker(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = watch::channel(false);
        let guard = StartedGuard(self.started.clone());
        let cfg = (*self.cfg).clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            if let Err(e) = worker::run_loop(&cfg, rx) {
                error!(error = %e, "vitals worker crashed");
            }
        });

        let mut task = self.task.lock().expect("scheduler task lock");
        task.handle = Some(handle);
        task.shutdown = Some(tx);
        drop(task);

        self.starts_total.fetch_add(1, Ordering::SeqCst);
        info!("aggregation worker started");
    }

    /// Signal the worker to stop and wait for it to finish. The started
    /// flag resets via the worker's drop guard, so a later
    /// [`start_worker`](Self::start_worker) succeeds again.
    pub async fn stop_worker(&self) {
        let (handle, shutdown) = {
            let mut task = self.task.lock().expect("scheduler task lock");
            (task.handle.take(), task.shutdown.take())
        };
        if let Some(tx) = shutdown {
            let _ = tx.send(true);
        }
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task join failed");
            }
            info!("aggregation worker stopped");
        }
    }

    /// Queue a deferred gate check for an ingest event.
    ///
    /// Any number of calls within a cooldown window collapse into one
    /// pending check; when bulk and incremental requests overlap, the
    /// longer cooldown wins. The check re-arms itself until the cooldown
    /// has truly elapsed since the *latest* activity, then starts the
    /// worker if the gate holds.
    pub fn schedule_reevaluation(&self, kind: IngestKind) {
        let cooldown = self.cooldown(kind);
        {
            let mut pending = self.pending_cooldown.lock().expect("scheduler reeval lock");
            match *pending {
                Some(current) => {
                    if cooldown > current {
                        *pending = Some(cooldown);
                    }
                    return; // a check is already queued; it reads the update
                }
                None => *pending = Some(cooldown),
            }
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.run_reevaluation().await;
        });
    }

    async fn run_reevaluation(&self) {
        loop {
            let cooldown = match *self.pending_cooldown.lock().expect("scheduler reeval lock") {
                Some(cooldown) => cooldown,
                None => return,
            };
            if self.tracker.has_active_operations() {
                // still mid-backfill; check again a full cooldown later
                tokio::time::sleep(cooldown).await;
                continue;
            }
            match self.tracker.time_since_last_activity() {
                Some(elapsed) if elapsed < cooldown => {
                    tokio::time::sleep(cooldown - elapsed).await;
                }
                _ => break,
            }
        }

        *self.pending_cooldown.lock().expect("scheduler reeval lock") = None;
        if self.tracker.has_active_operations() {
            debug!("reevaluation raced a new sync operation; not starting");
            return;
        }
        self.start_worker();
    }
}
