//! Weekly rebalance: selection and weighting with hysteresis.
//!
//! Takes the latest feature row per game as of the rebalance date,
//! scores the eligible universe cross-sectionally, applies the
//! enter/exit rank bands against the previous vintage's members, fills
//! or truncates to the target constituent count, and weights the
//! selection by revenue level.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use rte_core::{FeatureRow, GameId, MembershipRecord, RankedRow, RebalanceParams};

use crate::ranking::percentile_ranks;

/// Composite score weights: level, momentum, risk penalty.
const LEVEL_WEIGHT: f64 = 0.65;
const MOMENTUM_WEIGHT: f64 = 0.25;
const RISK_WEIGHT: f64 = 0.10;

/// Output of one rebalance run.
#[derive(Debug, Clone)]
pub struct RebalanceResult {
    /// One vintage: a record per considered game, members flagged.
    pub membership: Vec<MembershipRecord>,
    /// Ranked universe for diagnostics/export.
    pub ranked: Vec<RankedRow>,
}

impl RebalanceResult {
    /// Records of selected members, in rank order.
    pub fn members(&self) -> Vec<&MembershipRecord> {
        self.membership.iter().filter(|m| m.in_index).collect()
    }

    fn empty() -> Self {
        Self {
            membership: Vec::new(),
            ranked: Vec::new(),
        }
    }
}

/// Latest feature row per game on or before `asof`, keyed ascending by
/// game id (the deterministic pre-score order).
fn latest_asof<'a>(features: &'a [FeatureRow], asof: NaiveDate) -> Vec<&'a FeatureRow> {
    let mut latest: std::collections::BTreeMap<GameId, &FeatureRow> =
        std::collections::BTreeMap::new();
    for row in features {
        if row.snapshot_date() > asof {
            continue;
        }
        latest
            .entry(row.game_id())
            .and_modify(|current| {
                if row.snapshot_date() > current.snapshot_date() {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    latest.into_values().collect()
}

/// Members of the latest vintage present in `history`.
fn previous_members(history: &[MembershipRecord]) -> HashSet<GameId> {
    let Some(last_date) = history.iter().map(|m| m.rebalance_date).max() else {
        return HashSet::new();
    };
    history
        .iter()
        .filter(|m| m.rebalance_date == last_date && m.in_index)
        .map(|m| m.game_id)
        .collect()
}

/// Composite cross-sectional score per eligible game.
fn score_universe(rows: &[&FeatureRow]) -> Vec<f64> {
    let levels: Vec<f64> = rows.iter().map(|r| r.edr_7d_mean).collect();
    let momentum: Vec<f64> = rows.iter().map(|r| r.edr_mom).collect();
    let risk: Vec<f64> = rows.iter().map(|r| r.edr_14d_vol).collect();

    let level_pct = percentile_ranks(&levels);
    let momentum_pct = percentile_ranks(&momentum);
    let risk_pct = percentile_ranks(&risk);

    (0..rows.len())
        .map(|i| {
            LEVEL_WEIGHT * level_pct[i] + MOMENTUM_WEIGHT * momentum_pct[i]
                - RISK_WEIGHT * risk_pct[i]
        })
        .collect()
}

/// Run the weekly selection at `rebalance_date`.
///
/// `prior_membership` is the full membership history so far (all past
/// vintages); pass an empty slice on the first rebalance. An empty
/// eligible universe yields an empty result, which is a valid terminal
/// state rather than an error.
pub fn rebalance_weekly(
    features: &[FeatureRow],
    rebalance_date: NaiveDate,
    params: &RebalanceParams,
    prior_membership: &[MembershipRecord],
) -> RebalanceResult {
    let latest = latest_asof(features, rebalance_date);

    let eligible: Vec<&FeatureRow> = latest
        .into_iter()
        .filter(|r| r.coverage_7d >= params.min_coverage_7d)
        .collect();

    if eligible.is_empty() {
        tracing::info!(%rebalance_date, "no eligible games at rebalance");
        return RebalanceResult::empty();
    }

    // Score and rank. The stable sort keeps the ascending game-id order
    // for tied scores.
    let scores = score_universe(&eligible);
    let mut order: Vec<usize> = (0..eligible.len()).collect();
    order.sort_by_key(|&i| Reverse(OrderedFloat(scores[i])));

    let ranked: Vec<RankedRow> = order
        .iter()
        .enumerate()
        .map(|(pos, &i)| {
            let row = eligible[i];
            RankedRow {
                game_id: row.game_id(),
                snapshot_date: row.snapshot_date(),
                score: scores[i],
                rank: pos as u32 + 1,
                edr_7d_mean: row.edr_7d_mean,
                edr_mom: row.edr_mom,
                edr_14d_vol: row.edr_14d_vol,
                coverage_7d: row.coverage_7d,
            }
        })
        .collect();

    // Hysteresis bands: newcomers must clear enter_rank, previous
    // members survive anywhere inside the wider exit band.
    let prev_members = previous_members(prior_membership);
    let mut selected: Vec<GameId> = ranked
        .iter()
        .filter(|r| {
            r.rank <= params.enter_rank
                || (prev_members.contains(&r.game_id) && r.rank <= params.exit_rank)
        })
        .map(|r| r.game_id)
        .collect();

    // Fill with the next best ranks, or truncate, to the target size.
    if selected.len() > params.n_constituents {
        selected.truncate(params.n_constituents);
    } else if selected.len() < params.n_constituents {
        let chosen: HashSet<GameId> = selected.iter().copied().collect();
        for r in &ranked {
            if selected.len() >= params.n_constituents {
                break;
            }
            if !chosen.contains(&r.game_id) {
                selected.push(r.game_id);
            }
        }
    }
    let selected: HashSet<GameId> = selected.into_iter().collect();

    // Revenue-level weights over members; equal weight when the level
    // sum degenerates to zero.
    let member_rows: Vec<&RankedRow> = ranked
        .iter()
        .filter(|r| selected.contains(&r.game_id))
        .collect();
    let denom: f64 = member_rows.iter().map(|r| r.edr_7d_mean.max(0.0)).sum();
    let weight_of = |row: &RankedRow| -> f64 {
        if denom > 0.0 {
            row.edr_7d_mean.max(0.0) / denom
        } else {
            1.0 / member_rows.len() as f64
        }
    };

    let membership: Vec<MembershipRecord> = ranked
        .iter()
        .map(|r| {
            let in_index = selected.contains(&r.game_id);
            MembershipRecord {
                rebalance_date,
                game_id: r.game_id,
                rank: r.rank,
                in_index,
                weight: if in_index { weight_of(r) } else { 0.0 },
            }
        })
        .collect();

    tracing::info!(
        %rebalance_date,
        eligible = ranked.len(),
        selected = selected.len(),
        "rebalance complete"
    );

    RebalanceResult { membership, ranked }
}
