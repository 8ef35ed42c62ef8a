//! Index-level compounding.
//!
//! Consumes the full snapshot history and the full membership history
//! (all vintages) and produces one compounded index observation per
//! calendar date with at least one weighted, matched snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rte_core::{Error, GameId, IndexParams, IndexPoint, MembershipRecord, Result, Snapshot};

/// Per-game daily log return with the eps stabilizer applied.
///
/// The first observation of a game has no predecessor and is defined to
/// return 0; non-positive stabilized operands also clamp to 0.
fn log_return(edr_raw: f64, edr_prev: f64, eps: f64) -> f64 {
    let a = edr_raw + eps;
    let b = edr_prev + eps;
    if a <= 0.0 || b <= 0.0 {
        0.0
    } else {
        (a / b).ln()
    }
}

/// Step function: each date maps to the greatest rebalance date <= it.
/// Dates before the first rebalance map to the first vintage.
fn effective_vintages(
    snap_dates: &[NaiveDate],
    rebalance_dates: &[NaiveDate],
) -> BTreeMap<NaiveDate, NaiveDate> {
    let mut mapping = BTreeMap::new();
    let mut j = 0usize;
    let mut current = rebalance_dates[0];
    for &date in snap_dates {
        while j + 1 < rebalance_dates.len() && rebalance_dates[j + 1] <= date {
            j += 1;
            current = rebalance_dates[j];
        }
        mapping.insert(date, current);
    }
    mapping
}

/// Build the compounded daily index series.
///
/// Joins each snapshot's log return to the membership vintage effective
/// on its date (inner join: games without a weight that day are
/// dropped, which lowers realized coverage), aggregates weighted log
/// returns per date, and compounds from `params.base_level`.
///
/// A membership history without any selected rows, or an empty snapshot
/// history, is an input error: there is no index to build.
pub fn build_index_level_series(
    snapshots: &[Snapshot],
    membership_history: &[MembershipRecord],
    params: &IndexParams,
) -> Result<Vec<IndexPoint>> {
    let members: Vec<&MembershipRecord> = membership_history
        .iter()
        .filter(|m| m.in_index)
        .collect();
    if members.is_empty() {
        return Err(Error::data(
            "membership history has no valid rebalance rows",
        ));
    }
    if snapshots.is_empty() {
        return Err(Error::data("snapshot history is empty"));
    }

    // Per-game chronological log returns.
    let mut sorted: Vec<&Snapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|s| (s.game_id, s.snapshot_date));

    let mut returns: Vec<(NaiveDate, GameId, f64)> = Vec::with_capacity(sorted.len());
    let mut prev: Option<(GameId, f64)> = None;
    for snap in &sorted {
        let edr_prev = match prev {
            Some((game_id, value)) if game_id == snap.game_id => value,
            _ => snap.edr_raw, // first observation for this game
        };
        returns.push((
            snap.snapshot_date,
            snap.game_id,
            log_return(snap.edr_raw, edr_prev, params.eps),
        ));
        prev = Some((snap.game_id, snap.edr_raw));
    }

    // Map every snapshot date to its effective vintage.
    let mut rebalance_dates: Vec<NaiveDate> = members.iter().map(|m| m.rebalance_date).collect();
    rebalance_dates.sort();
    rebalance_dates.dedup();

    let mut snap_dates: Vec<NaiveDate> = returns.iter().map(|(d, _, _)| *d).collect();
    snap_dates.sort();
    snap_dates.dedup();

    let vintage_of = effective_vintages(&snap_dates, &rebalance_dates);

    // Weight lookup per (vintage, game).
    let weights: HashMap<(NaiveDate, GameId), f64> = members
        .iter()
        .map(|m| ((m.rebalance_date, m.game_id), m.weight))
        .collect();

    // Aggregate weighted log return and realized coverage per date.
    let mut daily: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for (date, game_id, log_ret) in &returns {
        let Some(vintage) = vintage_of.get(date) else {
            continue;
        };
        let Some(weight) = weights.get(&(*vintage, *game_id)) else {
            continue; // not a member under this vintage
        };
        let entry = daily.entry(*date).or_insert((0.0, 0.0));
        entry.0 += weight * log_ret;
        entry.1 += weight;
    }

    // Compound from the base level.
    let mut level = params.base_level;
    let series: Vec<IndexPoint> = daily
        .into_iter()
        .map(|(date, (daily_log_return, coverage))| {
            level *= daily_log_return.exp();
            IndexPoint {
                date,
                index_level: level,
                daily_return: daily_log_return.exp() - 1.0,
                daily_log_return,
                coverage,
            }
        })
        .collect();

    Ok(series)
}
