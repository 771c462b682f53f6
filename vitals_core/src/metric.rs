//! Metric, source, and lifecycle vocabulary shared by every layer.
//!
//! All enums round-trip to lowercase snake_case codes for the TEXT columns
//! in SQLite. Keep the code maps exhaustive: an unknown code coming back
//! from the database is a data bug, so `from_code` returns a typed error
//! instead of guessing.

use serde::{Deserialize, Serialize};

/// Raised when a TEXT code loaded from the database has no matching variant.
#[derive(thiserror::Error, Debug)]
#[error("unknown {column} code: {code}")]
pub struct UnknownCode {
    /// The column the code came from (e.g. "metric_type").
    pub column: &'static str,
    /// The offending code.
    pub code: String,
}

/// Kind of vital being observed (serde snake_case).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Instantaneous heart rate, bpm.
    HeartRate,
    /// Resting heart rate, bpm.
    RestingHeartRate,
    /// Step count over the observation window.
    Steps,
    /// Distance walked or run, typically km.
    DistanceWalked,
    /// Active energy burned, typically kcal.
    ActiveEnergy,
    /// Sleep session; the window is the time asleep.
    Sleep,
    /// Workout session; `notes` may carry the discipline.
    Workout,
    /// Mindfulness/meditation session.
    Mindfulness,
    /// Systolic blood pressure, mmHg.
    BloodPressureSystolic,
    /// Diastolic blood pressure, mmHg.
    BloodPressureDiastolic,
    /// Blood oxygen saturation, percent.
    BloodOxygen,
    /// Body temperature, °C.
    BodyTemperature,
    /// Respiratory rate, breaths per minute.
    RespiratoryRate,
    /// Body weight, kg.
    BodyWeight,
}

/// How a metric's samples combine statistically within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Additive counters: the period total is the interesting number.
    Sum,
    /// Point-in-time readings: min/max/average over the period.
    Point,
    /// Sessions with a meaningful elapsed time: minutes accumulate,
    /// optionally broken down by sub-type.
    Duration,
}

impl MetricType {
    /// Every variant, in code order. Handy for exhaustive tests and seeds.
    pub const ALL: [MetricType; 14] = [
        MetricType::HeartRate,
        MetricType::RestingHeartRate,
        MetricType::Steps,
        MetricType::DistanceWalked,
        MetricType::ActiveEnergy,
        MetricType::Sleep,
        MetricType::Workout,
        MetricType::Mindfulness,
        MetricType::BloodPressureSystolic,
        MetricType::BloodPressureDiastolic,
        MetricType::BloodOxygen,
        MetricType::BodyTemperature,
        MetricType::RespiratoryRate,
        MetricType::BodyWeight,
    ];

    /// Stable DB code for this metric.
    pub const fn as_code(self) -> &'static str {
        match self {
            MetricType::HeartRate => "heart_rate",
            MetricType::RestingHeartRate => "resting_heart_rate",
            MetricType::Steps => "steps",
            MetricType::DistanceWalked => "distance_walked",
            MetricType::ActiveEnergy => "active_energy",
            MetricType::Sleep => "sleep",
            MetricType::Workout => "workout",
            MetricType::Mindfulness => "mindfulness",
            MetricType::BloodPressureSystolic => "blood_pressure_systolic",
            MetricType::BloodPressureDiastolic => "blood_pressure_diastolic",
            MetricType::BloodOxygen => "blood_oxygen",
            MetricType::BodyTemperature => "body_temperature",
            MetricType::RespiratoryRate => "respiratory_rate",
            MetricType::BodyWeight => "body_weight",
        }
    }

    /// Parse a DB code back into a variant.
    pub fn from_code(code: &str) -> Result<Self, UnknownCode> {
        MetricType::ALL
            .into_iter()
            .find(|m| m.as_code() == code)
            .ok_or_else(|| UnknownCode {
                column: "metric_type",
                code: code.to_string(),
            })
    }

    /// How samples of this metric combine within a rollup period.
    pub const fn kind(self) -> MetricKind {
        match self {
            MetricType::Steps | MetricType::DistanceWalked | MetricType::ActiveEnergy => {
                MetricKind::Sum
            }
            MetricType::Sleep | MetricType::Workout | MetricType::Mindfulness => {
                MetricKind::Duration
            }
            MetricType::HeartRate
            | MetricType::RestingHeartRate
            | MetricType::BloodPressureSystolic
            | MetricType::BloodPressureDiastolic
            | MetricType::BloodOxygen
            | MetricType::BodyTemperature
            | MetricType::RespiratoryRate
            | MetricType::BodyWeight => MetricKind::Point,
        }
    }
}

/// Which pipeline delivered a sample (serde snake_case).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Automatic sync from a paired wearable or phone.
    DeviceSync,
    /// Typed in by the user.
    ManualEntry,
    /// Extracted from an uploaded document.
    DocumentExtraction,
    /// Pushed by a third-party API integration.
    ApiImport,
}

impl DataSource {
    /// Every variant, in code order.
    pub const ALL: [DataSource; 4] = [
        DataSource::DeviceSync,
        DataSource::ManualEntry,
        DataSource::DocumentExtraction,
        DataSource::ApiImport,
    ];

    /// Stable DB code for this source.
    pub const fn as_code(self) -> &'static str {
        match self {
            DataSource::DeviceSync => "device_sync",
            DataSource::ManualEntry => "manual_entry",
            DataSource::DocumentExtraction => "document_extraction",
            DataSource::ApiImport => "api_import",
        }
    }

    /// Parse a DB code back into a variant.
    pub fn from_code(code: &str) -> Result<Self, UnknownCode> {
        DataSource::ALL
            .into_iter()
            .find(|s| s.as_code() == code)
            .ok_or_else(|| UnknownCode {
                column: "data_source",
                code: code.to_string(),
            })
    }
}

/// Aggregation lifecycle of a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStatus {
    /// Waiting to be picked up by the worker.
    Pending,
    /// Claimed by a worker pass.
    Processing,
    /// Folded into the rollups; `aggregated_at` is set.
    Completed,
    /// Quarantined after repeated failures; never claimed again.
    Failed,
}

impl AggregationStatus {
    /// Stable DB code for this status.
    pub const fn as_code(self) -> &'static str {
        match self {
            AggregationStatus::Pending => "pending",
            AggregationStatus::Processing => "processing",
            AggregationStatus::Completed => "completed",
            AggregationStatus::Failed => "failed",
        }
    }

    /// Parse a DB code back into a variant.
    pub fn from_code(code: &str) -> Result<Self, UnknownCode> {
        match code {
            "pending" => Ok(AggregationStatus::Pending),
            "processing" => Ok(AggregationStatus::Processing),
            "completed" => Ok(AggregationStatus::Completed),
            "failed" => Ok(AggregationStatus::Failed),
            other => Err(UnknownCode {
                column: "aggregation_status",
                code: other.to_string(),
            }),
        }
    }
}
