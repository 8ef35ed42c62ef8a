//! Command-line entry point for the EDR index engine.
//!
//! Daily cadence: run with no rebalance flag to ingest new snapshots
//! and rebuild features. Weekly cadence: pass `--rebalance-date`,
//! `--rebalance-today`, or let `--rebalance-auto` trigger on the
//! configured weekday.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use rte_core::Config;
use rte_engine::run_pipeline;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Run the EDR index engine (daily update + optional weekly rebalance)")]
struct Args {
    /// Path to the runs/ directory holding pruned daily snapshots.
    #[arg(long, default_value = "runs")]
    runs_dir: String,

    /// Directory for derived tables and exports.
    #[arg(long)]
    data_dir: Option<String>,

    /// Rebalance date (YYYY-MM-DD).
    #[arg(long, conflicts_with_all = ["rebalance_today", "rebalance_auto"])]
    rebalance_date: Option<NaiveDate>,

    /// Rebalance using today's date.
    #[arg(long)]
    rebalance_today: bool,

    /// Rebalance today only when today is the configured weekday.
    #[arg(long, conflicts_with = "rebalance_today")]
    rebalance_auto: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::default();
    if let Some(dir) = args.data_dir {
        config.storage.index_data_dir = dir;
    }

    let today = Local::now().date_naive();
    let rebalance_date = if args.rebalance_today {
        Some(today)
    } else if args.rebalance_auto {
        if config.rebalance.is_rebalance_day(today) {
            Some(today)
        } else {
            tracing::info!(%today, "not a rebalance day, running daily update only");
            None
        }
    } else {
        args.rebalance_date
    };

    let (snapshots, features) = run_pipeline(&args.runs_dir, rebalance_date, &config)
        .context("index engine run failed")?;
    tracing::info!(
        snapshots = snapshots.len(),
        features = features.len(),
        "run complete"
    );
    Ok(())
}
