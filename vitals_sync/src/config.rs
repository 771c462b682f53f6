//! Worker and scheduler configuration.
//!
//! Defaults come first, then an optional TOML file, then environment
//! overrides. Env wins, so deployments can tune a shared config file
//! per-instance. All knobs:
//!
//! | TOML key                             | env var                                |
//! |--------------------------------------|----------------------------------------|
//! | `database_url`                       | `DATABASE_URL`                         |
//! | `batch_size`                         | `VITALS_BATCH_SIZE`                    |
//! | `tick_secs`                          | `VITALS_WORKER_TICK`                   |
//! | `process_pending_on_startup`         | `PROCESS_PENDING_ON_STARTUP`           |
//! | `aggregation_delay_bulk_secs`        | `VITALS_AGGREGATION_DELAY_BULK`        |
//! | `aggregation_delay_incremental_secs` | `VITALS_AGGREGATION_DELAY_INCREMENTAL` |
//! | `max_row_failures`                   | `VITALS_MAX_ROW_FAILURES`              |

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

/// Runtime configuration for the aggregation pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// SQLite database path/URL shared with the serving process.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Rows claimed per worker pass. Large by default so one pass drains
    /// a bulk backfill instead of nibbling at it.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Seconds the worker sleeps between polling passes.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Drain rows left over by a previous crash before the first tick.
    #[serde(default = "default_process_pending")]
    pub process_pending_on_startup: bool,

    /// Cooldown after a bulk historical import, seconds.
    #[serde(default = "default_bulk_delay_secs")]
    pub aggregation_delay_bulk_secs: u64,

    /// Cooldown after an incremental/live push, seconds.
    #[serde(default = "default_incremental_delay_secs")]
    pub aggregation_delay_incremental_secs: u64,

    /// Consecutive failures before a row is quarantined as `failed`.
    #[serde(default = "default_max_row_failures")]
    pub max_row_failures: u32,
}

fn default_database_url() -> String {
    "vitals.db".to_string()
}
fn default_batch_size() -> i64 {
    20_000
}
fn default_tick_secs() -> u64 {
    5
}
fn default_process_pending() -> bool {
    true
}
fn default_bulk_delay_secs() -> u64 {
    60
}
fn default_incremental_delay_secs() -> u64 {
    15
}
fn default_max_row_failures() -> u32 {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            database_url: default_database_url(),
            batch_size: default_batch_size(),
            tick_secs: default_tick_secs(),
            process_pending_on_startup: default_process_pending(),
            aggregation_delay_bulk_secs: default_bulk_delay_secs(),
            aggregation_delay_incremental_secs: default_incremental_delay_secs(),
            max_row_failures: default_max_row_failures(),
        }
    }
}

impl WorkerConfig {
    /// Worker poll interval.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    /// Cooldown applied after a bulk import.
    pub fn bulk_delay(&self) -> Duration {
        Duration::from_secs(self.aggregation_delay_bulk_secs)
    }

    /// Cooldown applied after an incremental push.
    pub fn incremental_delay(&self) -> Duration {
        Duration::from_secs(self.aggregation_delay_incremental_secs)
    }
}

/// Load configuration: defaults, then the TOML file if given, then env
/// overrides.
pub fn load(path: Option<&Path>) -> anyhow::Result<WorkerConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("read config file {}", p.display()))?;
            toml::from_str(&text).context("failed to parse config TOML")?
        }
        None => WorkerConfig::default(),
    };
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut WorkerConfig) -> anyhow::Result<()> {
    if let Some(v) = env_var("DATABASE_URL") {
        cfg.database_url = v;
    }
    if let Some(v) = env_var("VITALS_BATCH_SIZE") {
        cfg.batch_size = v.parse().context("VITALS_BATCH_SIZE must be an integer")?;
    }
    if let Some(v) = env_var("VITALS_WORKER_TICK") {
        cfg.tick_secs = v.parse().context("VITALS_WORKER_TICK must be seconds")?;
    }
    if let Some(v) = env_var("PROCESS_PENDING_ON_STARTUP") {
        cfg.process_pending_on_startup = parse_bool(&v)
            .context("PROCESS_PENDING_ON_STARTUP must be a boolean")?;
    }
    if let Some(v) = env_var("VITALS_AGGREGATION_DELAY_BULK") {
        cfg.aggregation_delay_bulk_secs = v
            .parse()
            .context("VITALS_AGGREGATION_DELAY_BULK must be seconds")?;
    }
    if let Some(v) = env_var("VITALS_AGGREGATION_DELAY_INCREMENTAL") {
        cfg.aggregation_delay_incremental_secs = v
            .parse()
            .context("VITALS_AGGREGATION_DELAY_INCREMENTAL must be seconds")?;
    }
    if let Some(v) = env_var("VITALS_MAX_ROW_FAILURES") {
        cfg.max_row_failures = v.parse().context("VITALS_MAX_ROW_FAILURES must be an integer")?;
    }
    Ok(())
}

/// Read an env var, treating unset and empty the same.
fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: {other}"),
    }
}
