#![allow(dead_code)]

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use diesel::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use vitals_core::metric::{DataSource, MetricType};
use vitals_core::sample::VitalSample;
use vitals_sync::db::{connection, migrate};

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");
    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn heart_rate(user_id: i64, ts: DateTime<Utc>, bpm: f64) -> VitalSample {
    VitalSample {
        user_id,
        metric_type: MetricType::HeartRate,
        value: bpm,
        unit: "bpm".into(),
        start_ts: ts,
        end_ts: ts,
        data_source: DataSource::DeviceSync,
        source_device: Some("watch-01".into()),
        notes: None,
        confidence_score: None,
    }
}

pub fn steps(user_id: i64, start: DateTime<Utc>, end: DateTime<Utc>, count: f64) -> VitalSample {
    VitalSample {
        user_id,
        metric_type: MetricType::Steps,
        value: count,
        unit: "count".into(),
        start_ts: start,
        end_ts: end,
        data_source: DataSource::DeviceSync,
        source_device: Some("watch-01".into()),
        notes: None,
        confidence_score: None,
    }
}

pub fn workout(
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    discipline: &str,
) -> VitalSample {
    VitalSample {
        user_id,
        metric_type: MetricType::Workout,
        value: 0.0,
        unit: "min".into(),
        start_ts: start,
        end_ts: end,
        data_source: DataSource::DeviceSync,
        source_device: None,
        notes: Some(discipline.into()),
        confidence_score: None,
    }
}

pub fn count_with_status(conn: &mut SqliteConnection, status: &str) -> i64 {
    use vitals_sync::schema::raw_vitals::dsl as rv;
    rv::raw_vitals
        .filter(rv::aggregation_status.eq(status))
        .count()
        .get_result(conn)
        .expect("count by status")
}

pub fn raw_count(conn: &mut SqliteConnection) -> i64 {
    use vitals_sync::schema::raw_vitals::dsl as rv;
    rv::raw_vitals.count().get_result(conn).expect("count")
}
