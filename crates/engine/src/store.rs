//! JSON flat-file persistence for the derived tables.
//!
//! The engine owns three append/recompute tables under the data
//! directory: snapshots, features and membership. Loading a table that
//! does not exist yet yields an empty one; saving always rewrites the
//! whole file. Historical rows are never edited in place; the only
//! mutation is the keep-most-recent deduplication applied when merging
//! freshly computed snapshots.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rte_core::{FeatureRow, MembershipRecord, Result, Snapshot, StorageParams};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Handle on the engine's table files.
#[derive(Debug, Clone)]
pub struct Store {
    params: StorageParams,
}

impl Store {
    /// Create a store over the configured locations.
    pub fn new(params: &StorageParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Root data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.params.index_data_dir)
    }

    /// Directory for human-readable exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir().join(&self.params.exports_dir)
    }

    /// File-name prefix for exported tables.
    pub fn export_prefix(&self) -> &str {
        &self.params.export_prefix
    }

    fn snapshots_path(&self) -> PathBuf {
        self.data_dir().join(&self.params.snapshots_file)
    }

    fn features_path(&self) -> PathBuf {
        self.data_dir().join(&self.params.features_file)
    }

    fn membership_path(&self) -> PathBuf {
        self.data_dir().join(&self.params.membership_file)
    }

    /// Load the snapshot table, or an empty one if none exists yet.
    pub fn load_snapshots(&self) -> Result<Vec<Snapshot>> {
        load_table(&self.snapshots_path())
    }

    /// Persist the snapshot table.
    pub fn save_snapshots(&self, rows: &[Snapshot]) -> Result<()> {
        save_table(rows, &self.snapshots_path())
    }

    /// Load the feature table, or an empty one if none exists yet.
    pub fn load_features(&self) -> Result<Vec<FeatureRow>> {
        load_table(&self.features_path())
    }

    /// Persist the feature table.
    pub fn save_features(&self, rows: &[FeatureRow]) -> Result<()> {
        save_table(rows, &self.features_path())
    }

    /// Load the full membership history, or an empty one.
    pub fn load_membership(&self) -> Result<Vec<MembershipRecord>> {
        load_table(&self.membership_path())
    }

    /// Persist the full membership history.
    pub fn save_membership(&self, rows: &[MembershipRecord]) -> Result<()> {
        save_table(rows, &self.membership_path())
    }
}

fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let rows = serde_json::from_reader(reader)?;
    Ok(rows)
}

fn save_table<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, rows)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "saved table");
    Ok(())
}

/// Merge freshly computed snapshots into the existing table.
///
/// Output is sorted by (date, game id) and deduplicated on that key,
/// keeping the most recently computed row (new rows win over existing
/// ones).
pub fn merge_snapshots(existing: Vec<Snapshot>, new: Vec<Snapshot>) -> Vec<Snapshot> {
    let mut merged: BTreeMap<(chrono::NaiveDate, rte_core::GameId), Snapshot> = BTreeMap::new();
    for snap in existing.into_iter().chain(new) {
        merged.insert((snap.snapshot_date, snap.game_id), snap);
    }
    merged.into_values().collect()
}
