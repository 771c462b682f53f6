//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] opens a SQLite connection with WAL,
//!   foreign_keys=ON, and a 5000ms busy_timeout.
//! - [`migrate::run_sqlite`] applies the embedded Diesel migrations.
//!
//! The request-serving process and the worker process each open their own
//! connections against the same database file; WAL keeps readers from
//! blocking the worker's write passes.

pub mod connection;
pub mod migrate;
