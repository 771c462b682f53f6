use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vitals_sync::activity::SyncActivityTracker;
use vitals_sync::config;
use vitals_sync::db::migrate;
use vitals_sync::scheduler::AggregationScheduler;

#[derive(Parser)]
#[command(version, about = "Vitals aggregation worker")]
struct Cli {
    /// Optional TOML config file; env vars override it either way.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the aggregation worker until terminated by signal.
    Run,
    /// Apply pending schema migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_sqlite(&cfg.database_url)?;
            info!(database_url = %cfg.database_url, "migrations applied");
        }
        Cmd::Run => {
            migrate::run_sqlite(&cfg.database_url)?;

            // The worker process has no live ingest traffic of its own, so
            // the gate is wide open: start immediately and poll until a
            // signal arrives.
            let tracker = Arc::new(SyncActivityTracker::new());
            let scheduler = AggregationScheduler::new(tracker, cfg);
            scheduler.start_worker();

            tokio::signal::ctrl_c().await?;
            info!("signal received, shutting down");
            scheduler.stop_worker().await;
        }
    }

    Ok(())
}
