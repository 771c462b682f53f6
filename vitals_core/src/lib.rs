//! Domain model and pure aggregation logic for health-vital rollups.
//!
//! This crate has no I/O: it defines the metric/source/status vocabulary,
//! the raw sample type, UTC bucket math for the four rollup granularities
//! (hour, day, week, month), and the aggregation functions that fold raw
//! samples into hourly statistics and reduce finer rollups into coarser
//! ones. Persistence and scheduling live in `vitals_sync`.

#![deny(missing_docs)]

pub mod aggregate;
pub mod bucket;
pub mod metric;
pub mod sample;
pub mod time;
