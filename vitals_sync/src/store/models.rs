//! Insertable/Queryable helper structs used by the store implementation.

use diesel::prelude::*;
use vitals_core::metric::{DataSource, MetricType};
use vitals_core::sample::VitalSample;
use vitals_core::time;

use crate::schema::raw_vitals;
use crate::store::StoreError;

#[derive(Insertable, Debug)]
#[diesel(table_name = raw_vitals)]
pub(crate) struct NewRawVital<'a> {
    pub(crate) user_id: i64,
    pub(crate) metric_type: &'static str,
    pub(crate) value: f64,
    pub(crate) unit: &'a str,
    pub(crate) start_ts: String, // RFC3339 UTC
    pub(crate) end_ts: String,   // RFC3339 UTC
    pub(crate) data_source: &'static str,
    pub(crate) source_device: Option<&'a str>,
    pub(crate) notes: Option<&'a str>,
    pub(crate) dedup_note: &'a str,
    pub(crate) confidence_score: Option<f64>,
    pub(crate) aggregation_status: &'static str,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

/// One persisted raw sample, exactly as stored. Loaded through the
/// `UPDATE .. RETURNING` claim statement, hence by name.
#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = raw_vitals)]
pub struct RawVitalRow {
    /// Row id.
    pub id: i32,
    /// Owner of the sample.
    pub user_id: i64,
    /// Metric code (see `vitals_core::metric`).
    pub metric_type: String,
    /// Observed value.
    pub value: f64,
    /// Unit string.
    pub unit: String,
    /// Window start, RFC-3339 UTC.
    pub start_ts: String,
    /// Window end, RFC-3339 UTC.
    pub end_ts: String,
    /// Source code (see `vitals_core::metric`).
    pub data_source: String,
    /// Reporting device, when known.
    pub source_device: Option<String>,
    /// Free-form annotation.
    pub notes: Option<String>,
    /// `notes` coalesced to '' for the dedup index.
    pub dedup_note: String,
    /// Extraction confidence, when known.
    pub confidence_score: Option<f64>,
    /// Lifecycle status code.
    pub aggregation_status: String,
    /// When the row was folded into the rollups.
    pub aggregated_at: Option<String>,
    /// Insert timestamp.
    pub created_at: String,
    /// Last lifecycle transition timestamp.
    pub updated_at: String,
}

impl RawVitalRow {
    /// Parse the stored codes and timestamps back into a domain sample.
    pub fn to_sample(&self) -> Result<VitalSample, StoreError> {
        let malformed = |reason: String| StoreError::MalformedRow {
            id: self.id,
            reason,
        };

        Ok(VitalSample {
            user_id: self.user_id,
            metric_type: MetricType::from_code(&self.metric_type)
                .map_err(|e| malformed(e.to_string()))?,
            value: self.value,
            unit: self.unit.clone(),
            start_ts: time::parse_utc(&self.start_ts).map_err(|e| malformed(e.to_string()))?,
            end_ts: time::parse_utc(&self.end_ts).map_err(|e| malformed(e.to_string()))?,
            data_source: DataSource::from_code(&self.data_source)
                .map_err(|e| malformed(e.to_string()))?,
            source_device: self.source_device.clone(),
            notes: self.notes.clone(),
            confidence_score: self.confidence_score,
        })
    }
}

impl<'a> NewRawVital<'a> {
    pub(crate) fn from_sample(sample: &'a VitalSample, now: &str) -> Self {
        NewRawVital {
            user_id: sample.user_id,
            metric_type: sample.metric_type.as_code(),
            value: sample.value,
            unit: &sample.unit,
            start_ts: time::to_rfc3339_millis(sample.start_ts),
            end_ts: time::to_rfc3339_millis(sample.end_ts),
            data_source: sample.data_source.as_code(),
            source_device: sample.source_device.as_deref(),
            notes: sample.notes.as_deref(),
            dedup_note: sample.notes.as_deref().unwrap_or(""),
            confidence_score: sample.confidence_score,
            aggregation_status: vitals_core::metric::AggregationStatus::Pending.as_code(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}
