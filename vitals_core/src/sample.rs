//! Canonical in-memory representation of one observed vital.
//!
//! This struct is the ingestion payload and the worker's unit of work,
//! independent of how rows are stored. The observation window is
//! `[start_ts, end_ts]`; point readings use a zero-length window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metric::{DataSource, MetricType};

/// One observed health-vital value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSample {
    /// Owner of the sample.
    pub user_id: i64,
    /// What was measured.
    pub metric_type: MetricType,
    /// The observed value, in `unit`.
    pub value: f64,
    /// Unit string as delivered by the source (e.g. "bpm", "count", "kg").
    pub unit: String,
    /// Observation window start (UTC). Buckets are keyed off this instant.
    pub start_ts: DateTime<Utc>,
    /// Observation window end (UTC); equals `start_ts` for point readings.
    pub end_ts: DateTime<Utc>,
    /// Which pipeline delivered the sample.
    pub data_source: DataSource,
    /// Reporting device, when known.
    pub source_device: Option<String>,
    /// Free-form annotation; for duration metrics this may encode a
    /// sub-type (e.g. a workout discipline) that feeds the breakdown.
    pub notes: Option<String>,
    /// Extraction confidence in [0, 1], for document-extracted samples.
    pub confidence_score: Option<f64>,
}

impl VitalSample {
    /// Elapsed minutes of the observation window, falling back to the
    /// sample value when the window is zero-length (manual entries often
    /// record a duration value without a real window).
    pub fn window_minutes(&self) -> f64 {
        let secs = (self.end_ts - self.start_ts).num_seconds();
        if secs > 0 {
            secs as f64 / 60.0
        } else {
            self.value
        }
    }

    /// The sub-type key this sample contributes to a breakdown, when its
    /// notes carry one: the trimmed, lowercased notes string.
    pub fn breakdown_key(&self) -> Option<String> {
        let notes = self.notes.as_deref()?.trim();
        if notes.is_empty() {
            None
        } else {
            Some(notes.to_lowercase())
        }
    }
}
