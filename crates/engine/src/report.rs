//! Weekly rebalance report.
//!
//! Produces a short markdown narrative per rebalance from the exported
//! constituent table plus the membership history (for entrants/exits).

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use rte_core::{GameId, MembershipRecord, Result};

use crate::export::ExportRow;
use crate::store::Store;

/// How many constituents the report table shows.
const TOP_N: usize = 10;

fn display_name(row: &ExportRow) -> String {
    row.name
        .clone()
        .unwrap_or_else(|| format!("game {}", row.game_id))
}

/// Write the weekly markdown report for one rebalance.
///
/// `membership_history` must hold the vintages prior to this rebalance
/// (empty on the first one). Returns the report path.
pub fn write_weekly_report(
    export_rows: &[ExportRow],
    membership_history: &[MembershipRecord],
    rebalance_date: NaiveDate,
    store: &Store,
) -> Result<PathBuf> {
    let current: HashSet<GameId> = export_rows.iter().map(|r| r.game_id).collect();

    let prev_date = membership_history.iter().map(|m| m.rebalance_date).max();
    let previous: HashSet<GameId> = match prev_date {
        Some(date) => membership_history
            .iter()
            .filter(|m| m.rebalance_date == date && m.in_index)
            .map(|m| m.game_id)
            .collect(),
        None => HashSet::new(),
    };

    let mut entrants: Vec<GameId> = current.difference(&previous).copied().collect();
    let mut exits: Vec<GameId> = previous.difference(&current).copied().collect();
    entrants.sort();
    exits.sort();

    let total_weight: f64 = export_rows.iter().map(|r| r.weight).sum();
    let mean_coverage = if export_rows.is_empty() {
        0.0
    } else {
        export_rows.iter().map(|r| r.coverage_7d).sum::<f64>() / export_rows.len() as f64
    };

    let mut body = String::new();
    let _ = writeln!(body, "# Index Rebalance Report: {rebalance_date}");
    let _ = writeln!(body);
    let _ = writeln!(body, "## Overview");
    let _ = writeln!(body);
    let _ = writeln!(body, "- Constituents: {}", export_rows.len());
    let _ = writeln!(body, "- Total weight: {total_weight:.6}");
    let _ = writeln!(body, "- Mean 7d coverage: {mean_coverage:.3}");
    match prev_date {
        Some(date) => {
            let _ = writeln!(body, "- Previous rebalance: {date}");
        }
        None => {
            let _ = writeln!(body, "- First rebalance (no prior vintage)");
        }
    }
    let _ = writeln!(body);

    let _ = writeln!(body, "## Turnover");
    let _ = writeln!(body);
    if prev_date.is_none() {
        let _ = writeln!(body, "Initial selection; turnover is not defined.");
    } else if entrants.is_empty() && exits.is_empty() {
        let _ = writeln!(body, "No membership changes this week.");
    } else {
        let _ = writeln!(body, "- Entrants ({}): {:?}", entrants.len(), entrants);
        let _ = writeln!(body, "- Exits ({}): {:?}", exits.len(), exits);
    }
    let _ = writeln!(body);

    let _ = writeln!(body, "## Top constituents");
    let _ = writeln!(body);
    let _ = writeln!(body, "| Rank | Game | Developer | Weight | 7d EDR | Score |");
    let _ = writeln!(body, "|-----:|------|-----------|-------:|-------:|------:|");
    for row in export_rows.iter().take(TOP_N) {
        let _ = writeln!(
            body,
            "| {} | {} | {} | {:.4} | {:.2} | {:.4} |",
            row.rank,
            display_name(row),
            row.developer.as_deref().unwrap_or("-"),
            row.weight,
            row.edr_7d_mean,
            row.score,
        );
    }

    let out_dir = store.exports_dir();
    fs::create_dir_all(&out_dir)?;
    let path = out_dir.join(format!(
        "{}_report_{rebalance_date}.md",
        store.export_prefix()
    ));
    fs::write(&path, body)?;
    tracing::info!(path = %path.display(), "weekly report written");
    Ok(path)
}
