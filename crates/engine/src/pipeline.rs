//! Pipeline orchestration.
//!
//! Daily leg: ingest run files, estimate EDR, merge into the snapshot
//! store, recompute the feature table. Weekly leg (when a rebalance
//! date is given): select and weight the vintage, append it to the
//! membership store, write exports, the report and the index series.
//!
//! Input/configuration failures abort the run before the failing stage
//! persists anything; sparse data (an empty vintage) is a valid outcome.

use std::path::Path;

use chrono::NaiveDate;
use rte_core::{Config, Error, FeatureRow, Result, Snapshot};
use rte_features::{compute_edr_daily, compute_rolling_features};
use rte_ingestion::{discover_run_files, load_run_file};

use crate::export::{export_rebalance_outputs, write_index_level_exports};
use crate::index_level::build_index_level_series;
use crate::rebalance::{rebalance_weekly, RebalanceResult};
use crate::report::write_weekly_report;
use crate::store::{merge_snapshots, Store};

/// Ingest all run files and update the append-only snapshot store.
///
/// Every discovered run file is normalized, pushed through the EDR
/// estimator and merged into the existing table (deduplicated by
/// (date, game id), newest computation wins). Returns the merged table.
pub fn update_snapshots_from_runs(
    runs_dir: impl AsRef<Path>,
    config: &Config,
) -> Result<Vec<Snapshot>> {
    let runs_dir = runs_dir.as_ref();
    let store = Store::new(&config.storage);

    let run_files = discover_run_files(runs_dir)?;
    if run_files.is_empty() {
        return Err(Error::input(format!(
            "no pruned runs found under {}",
            runs_dir.display()
        )));
    }

    let mut new_rows: Vec<Snapshot> = Vec::new();
    for (date, path) in &run_files {
        let raw = load_run_file(path, *date)?;
        new_rows.extend(compute_edr_daily(&raw, *date, &config.edr));
    }

    let existing = store.load_snapshots()?;
    let merged = merge_snapshots(existing, new_rows);
    store.save_snapshots(&merged)?;

    tracing::info!(
        runs = run_files.len(),
        rows = merged.len(),
        "snapshot store updated"
    );
    Ok(merged)
}

/// Recompute the feature table from the full snapshot history.
pub fn rebuild_features(snapshots: &[Snapshot], config: &Config) -> Result<Vec<FeatureRow>> {
    let store = Store::new(&config.storage);
    let features = compute_rolling_features(snapshots, &config.rolling);
    store.save_features(&features)?;
    tracing::info!(rows = features.len(), "feature table rebuilt");
    Ok(features)
}

/// Run the weekly leg at `rebalance_date`.
///
/// Appends the new vintage to the membership store, then writes the
/// constituent exports, the weekly report and the recomputed index
/// series. An empty vintage (no eligible games) skips the exports but
/// is not an error.
pub fn run_weekly_rebalance(
    features: &[FeatureRow],
    rebalance_date: NaiveDate,
    config: &Config,
) -> Result<RebalanceResult> {
    let store = Store::new(&config.storage);

    let prior = store.load_membership()?;
    let result = rebalance_weekly(features, rebalance_date, &config.rebalance, &prior);

    let mut history = prior.clone();
    history.extend(result.membership.iter().cloned());
    store.save_membership(&history)?;

    let snapshots = store.load_snapshots()?;

    if result.membership.is_empty() {
        tracing::warn!(%rebalance_date, "empty vintage: no eligible games, skipping exports");
    } else {
        let export_rows =
            export_rebalance_outputs(&result.membership, &result.ranked, &snapshots, &store)?;
        write_weekly_report(&export_rows, &prior, rebalance_date, &store)?;
    }

    if history.iter().any(|m| m.in_index) {
        let series = build_index_level_series(&snapshots, &history, &config.index)?;
        write_index_level_exports(&series, &store)?;
    } else {
        tracing::warn!("membership history has no members yet, skipping index build");
    }

    Ok(result)
}

/// Full engine run.
///
/// Daily: update snapshots and rebuild features. Weekly: additionally
/// rebalance when `rebalance_date` is given.
pub fn run_pipeline(
    runs_dir: impl AsRef<Path>,
    rebalance_date: Option<NaiveDate>,
    config: &Config,
) -> Result<(Vec<Snapshot>, Vec<FeatureRow>)> {
    let snapshots = update_snapshots_from_runs(runs_dir, config)?;
    let features = rebuild_features(&snapshots, config)?;

    if let Some(date) = rebalance_date {
        run_weekly_rebalance(&features, date, config)?;
    }

    Ok((snapshots, features))
}
