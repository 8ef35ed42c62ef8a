//! Human-readable exports.
//!
//! After a rebalance the membership vintage is joined with the latest
//! snapshot per game (for name/developer and latest metrics) and the
//! ranked diagnostics, then written as dated and "latest" CSV/JSON
//! tables. The index-level series gets its own pair of exports.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rte_core::{GameId, IndexPoint, MembershipRecord, RankedRow, Result, Snapshot};
use serde::Serialize;

use crate::store::Store;

/// One exported constituent row, human-friendly column order.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub rebalance_date: NaiveDate,
    pub rank: u32,
    pub game_id: GameId,
    pub name: Option<String>,
    pub developer: Option<String>,
    pub weight: f64,
    pub edr_7d_mean: f64,
    pub edr_mom: f64,
    pub edr_14d_vol: f64,
    pub coverage_7d: f64,
    pub avg_ccu: f64,
    pub visits: f64,
    pub favorites: f64,
    pub likes: f64,
    pub monetization_count: u64,
    pub median_price: f64,
    pub price_dispersion: f64,
    pub engagement_score: f64,
    pub edr_raw: f64,
    pub score: f64,
}

/// Latest snapshot per game on or before `asof`.
pub fn latest_snapshots_asof(snapshots: &[Snapshot], asof: NaiveDate) -> BTreeMap<GameId, Snapshot> {
    let mut latest: BTreeMap<GameId, Snapshot> = BTreeMap::new();
    for snap in snapshots {
        if snap.snapshot_date > asof {
            continue;
        }
        match latest.get(&snap.game_id) {
            Some(current) if current.snapshot_date >= snap.snapshot_date => {}
            _ => {
                latest.insert(snap.game_id, snap.clone());
            }
        }
    }
    latest
}

/// Join a vintage's members with snapshot metadata and ranked features.
fn build_export_rows(
    membership: &[MembershipRecord],
    ranked: &[RankedRow],
    snapshots: &[Snapshot],
    rebalance_date: NaiveDate,
) -> Vec<ExportRow> {
    let latest = latest_snapshots_asof(snapshots, rebalance_date);
    let ranked_by_game: BTreeMap<GameId, &RankedRow> =
        ranked.iter().map(|r| (r.game_id, r)).collect();

    let mut rows: Vec<ExportRow> = membership
        .iter()
        .filter(|m| m.in_index)
        .map(|m| {
            let snap = latest.get(&m.game_id);
            let diag = ranked_by_game.get(&m.game_id);
            ExportRow {
                rebalance_date,
                rank: m.rank,
                game_id: m.game_id,
                name: snap.and_then(|s| s.name.clone()),
                developer: snap.and_then(|s| s.developer.clone()),
                weight: m.weight,
                edr_7d_mean: diag.map(|d| d.edr_7d_mean).unwrap_or(0.0),
                edr_mom: diag.map(|d| d.edr_mom).unwrap_or(0.0),
                edr_14d_vol: diag.map(|d| d.edr_14d_vol).unwrap_or(0.0),
                coverage_7d: diag.map(|d| d.coverage_7d).unwrap_or(0.0),
                avg_ccu: snap.map(|s| s.avg_ccu).unwrap_or(0.0),
                visits: snap.map(|s| s.visits).unwrap_or(0.0),
                favorites: snap.map(|s| s.favorites).unwrap_or(0.0),
                likes: snap.map(|s| s.likes).unwrap_or(0.0),
                monetization_count: snap.map(|s| s.monetization_count).unwrap_or(0),
                median_price: snap.map(|s| s.median_price).unwrap_or(0.0),
                price_dispersion: snap.map(|s| s.price_dispersion).unwrap_or(0.0),
                engagement_score: snap.map(|s| s.engagement_score).unwrap_or(0.0),
                edr_raw: snap.map(|s| s.edr_raw).unwrap_or(0.0),
                score: diag.map(|d| d.score).unwrap_or(0.0),
            }
        })
        .collect();

    rows.sort_by_key(|r| r.rank);
    rows
}

fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| rte_core::Error::storage(format!("csv write failed: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| rte_core::Error::storage(format!("csv flush failed: {e}")))?;
    tracing::info!(path = %path.display(), "exported");
    Ok(())
}

fn write_json<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, rows)?;
    tracing::info!(path = %path.display(), "exported");
    Ok(())
}

/// Write the dated and "latest" constituent tables for one vintage.
///
/// An empty vintage writes nothing. Returns the joined export rows so
/// downstream consumers (the weekly report) can reuse them.
pub fn export_rebalance_outputs(
    membership: &[MembershipRecord],
    ranked: &[RankedRow],
    snapshots: &[Snapshot],
    store: &Store,
) -> Result<Vec<ExportRow>> {
    let Some(rebalance_date) = membership.first().map(|m| m.rebalance_date) else {
        return Ok(Vec::new());
    };

    let rows = build_export_rows(membership, ranked, snapshots, rebalance_date);

    let out_dir = store.exports_dir();
    fs::create_dir_all(&out_dir)?;
    let prefix = store.export_prefix();

    write_csv(&rows, &dated_path(&out_dir, prefix, rebalance_date, "csv"))?;
    write_json(&rows, &dated_path(&out_dir, prefix, rebalance_date, "json"))?;
    write_csv(&rows, &out_dir.join(format!("{prefix}_latest.csv")))?;
    write_json(&rows, &out_dir.join(format!("{prefix}_latest.json")))?;

    Ok(rows)
}

/// Write the index-level series exports.
pub fn write_index_level_exports(series: &[IndexPoint], store: &Store) -> Result<()> {
    let out_dir = store.exports_dir();
    fs::create_dir_all(&out_dir)?;
    let prefix = store.export_prefix();

    write_csv(series, &out_dir.join(format!("{prefix}_index_level.csv")))?;
    write_json(series, &out_dir.join(format!("{prefix}_index_level.json")))?;
    Ok(())
}

fn dated_path(dir: &Path, prefix: &str, date: NaiveDate, ext: &str) -> PathBuf {
    dir.join(format!("{prefix}_{date}.{ext}"))
}
