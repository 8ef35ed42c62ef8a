//! Run-file discovery.
//!
//! Daily collection runs land on disk as
//! `runs/<run-dir>/pruned/<...>.json`, with the snapshot date embedded
//! somewhere in the path as a `YYYY-MM-DD` token.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rte_core::{Error, Result};

/// Find the first `YYYY-MM-DD` token in a path.
fn date_in_path(path: &Path) -> Option<NaiveDate> {
    let text = path.to_string_lossy();
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    for start in 0..=bytes.len() - 10 {
        if let Ok(token) = std::str::from_utf8(&bytes[start..start + 10]) {
            if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }
    None
}

/// Discover pruned run files under `runs_dir`.
///
/// Matches the collection layout `runs/*/pruned/*.json` and returns
/// (snapshot date, file path) pairs sorted by date. Files without a
/// recognizable date token are skipped. A missing runs directory is an
/// input error; an empty result is left for the caller to judge.
pub fn discover_run_files(runs_dir: impl AsRef<Path>) -> Result<Vec<(NaiveDate, PathBuf)>> {
    let runs_dir = runs_dir.as_ref();
    if !runs_dir.is_dir() {
        return Err(Error::input(format!(
            "runs dir not found: {}",
            runs_dir.display()
        )));
    }

    let mut files: Vec<(NaiveDate, PathBuf)> = Vec::new();
    for entry in fs::read_dir(runs_dir)? {
        let pruned = entry?.path().join("pruned");
        if !pruned.is_dir() {
            continue;
        }
        for file in fs::read_dir(&pruned)? {
            let path = file?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match date_in_path(&path) {
                Some(date) => files.push((date, path)),
                None => tracing::debug!(path = %path.display(), "no date token in run file path"),
            }
        }
    }

    files.sort();
    Ok(files)
}
