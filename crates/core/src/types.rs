//! Core data types for the EDR index engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Game identifier (the platform's universe id).
pub type GameId = u64;

/// One game's normalized attributes for a single snapshot day.
///
/// Produced by the ingestion layer from heterogeneous run files. Every
/// field except the id is optional; downstream derivations default
/// missing values instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGameDay {
    /// Game identifier.
    pub game_id: GameId,
    /// Display name, when present in the feed.
    pub name: Option<String>,
    /// Developer/studio name, when present in the feed.
    pub developer: Option<String>,
    /// Explicit average concurrent players.
    pub avg_ccu: Option<f64>,
    /// Raw concurrent player count (fallback when `avg_ccu` is absent).
    pub ccu: Option<f64>,
    /// Lifetime visit count.
    pub visits: Option<f64>,
    /// Favorite count.
    pub favorites: Option<f64>,
    /// Like (thumbs-up) count.
    pub likes: Option<f64>,
    /// Gamepass count, when the feed carries counts instead of lists.
    pub gamepass_count: Option<u64>,
    /// Developer-product count, when the feed carries counts.
    pub dev_product_count: Option<u64>,
    /// Prices extracted from gamepass list entries.
    pub gamepass_prices: Vec<f64>,
    /// Prices extracted from developer-product list entries.
    pub dev_product_prices: Vec<f64>,
}

impl RawGameDay {
    /// Average CCU: explicit field first, raw count second, 0 otherwise.
    #[inline]
    pub fn resolved_ccu(&self) -> f64 {
        self.avg_ccu.or(self.ccu).unwrap_or(0.0)
    }

    /// Monetization item count: sum of count fields when either is
    /// present, otherwise the summed lengths of the price lists.
    #[inline]
    pub fn monetization_count(&self) -> u64 {
        if self.gamepass_count.is_some() || self.dev_product_count.is_some() {
            self.gamepass_count.unwrap_or(0) + self.dev_product_count.unwrap_or(0)
        } else {
            (self.gamepass_prices.len() + self.dev_product_prices.len()) as u64
        }
    }

    /// Pooled gamepass + dev-product prices.
    pub fn price_pool(&self) -> Vec<f64> {
        let mut pool = Vec::with_capacity(self.gamepass_prices.len() + self.dev_product_prices.len());
        pool.extend_from_slice(&self.gamepass_prices);
        pool.extend_from_slice(&self.dev_product_prices);
        pool
    }
}

/// One row per (game, date): raw attributes plus derived EDR columns.
///
/// Immutable once written. The snapshot store is append-only,
/// deduplicated by (date, game id) keeping the most recent computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Calendar date of the snapshot.
    pub snapshot_date: NaiveDate,
    /// Game identifier.
    pub game_id: GameId,
    /// Display name carried through for exports.
    pub name: Option<String>,
    /// Developer name carried through for exports.
    pub developer: Option<String>,
    /// Average concurrent players that day.
    pub avg_ccu: f64,
    /// Lifetime visits.
    pub visits: f64,
    /// Favorite count.
    pub favorites: f64,
    /// Like count.
    pub likes: f64,
    /// Number of monetization items (gamepasses + dev products).
    pub monetization_count: u64,
    /// Median price across all monetization items.
    pub median_price: f64,
    /// Population std dev of prices divided by their mean.
    pub price_dispersion: f64,
    /// Clipped engagement proxy from favorite/like rates.
    pub engagement_score: f64,
    /// Estimated daily active users.
    pub dau_est: f64,
    /// Payer-conversion-rate proxy.
    pub pcr: f64,
    /// Average spend per paying user proxy.
    pub aspu: f64,
    /// DAU x PCR x ASPU spend component.
    pub spend_revenue: f64,
    /// Engagement-driven premium component.
    pub premium_revenue: f64,
    /// Estimated daily revenue (the composite metric).
    pub edr_raw: f64,
}

/// A snapshot row augmented with rolling/EMA signals.
///
/// One row per (game, date) over the full history; recomputed from the
/// entire snapshot series on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    /// The underlying snapshot row.
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// Observation density in the trailing 7-row window (count / 7).
    pub coverage_7d: f64,
    /// Trailing 7-row mean of `edr_raw` (falls back to the day's raw value).
    pub edr_7d_mean: f64,
    /// Trailing 7-row mean of `avg_ccu` (falls back to the day's raw value).
    pub ccu_7d_mean: f64,
    /// Fast EMA of `edr_raw`.
    pub edr_ema7: f64,
    /// Slow EMA of `edr_raw`.
    pub edr_ema30: f64,
    /// Momentum: fast EMA / slow EMA, zero-safe.
    pub edr_mom: f64,
    /// Trailing 14-row sample std dev / mean of `edr_raw`, zero-safe.
    pub edr_14d_vol: f64,
}

impl FeatureRow {
    /// Game identifier of the underlying snapshot.
    #[inline]
    pub fn game_id(&self) -> GameId {
        self.snapshot.game_id
    }

    /// Date of the underlying snapshot.
    #[inline]
    pub fn snapshot_date(&self) -> NaiveDate {
        self.snapshot.snapshot_date
    }
}

/// One scored game at a rebalance date. Ephemeral diagnostic output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRow {
    /// Game identifier.
    pub game_id: GameId,
    /// Date of the latest feature row used for scoring.
    pub snapshot_date: NaiveDate,
    /// Composite selection score.
    pub score: f64,
    /// 1-based rank by descending score.
    pub rank: u32,
    /// Level input to the score.
    pub edr_7d_mean: f64,
    /// Momentum input to the score.
    pub edr_mom: f64,
    /// Risk input to the score.
    pub edr_14d_vol: f64,
    /// Eligibility coverage at the rebalance date.
    pub coverage_7d: f64,
}

/// One considered game in a rebalance vintage.
///
/// A vintage is the complete set of records for a single rebalance date;
/// the membership store appends one vintage per rebalance and never
/// edits prior rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Rebalance date this vintage belongs to.
    pub rebalance_date: NaiveDate,
    /// Game identifier.
    pub game_id: GameId,
    /// 1-based rank at this rebalance.
    pub rank: u32,
    /// Whether the game was selected into the index.
    pub in_index: bool,
    /// Index weight; 0.0 for non-members, sums to 1.0 over members.
    pub weight: f64,
}

/// One compounded index observation per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    /// Calendar date.
    pub date: NaiveDate,
    /// Compounded index level.
    pub index_level: f64,
    /// Simple daily return, `exp(daily_log_return) - 1`.
    pub daily_return: f64,
    /// Weighted sum of member log returns.
    pub daily_log_return: f64,
    /// Sum of member weights matched to a same-day observation.
    pub coverage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(avg_ccu: Option<f64>, ccu: Option<f64>) -> RawGameDay {
        RawGameDay {
            game_id: 1,
            avg_ccu,
            ccu,
            ..RawGameDay::default()
        }
    }

    #[test]
    fn test_resolved_ccu_prefers_explicit() {
        assert_eq!(raw(Some(120.0), Some(80.0)).resolved_ccu(), 120.0);
        assert_eq!(raw(None, Some(80.0)).resolved_ccu(), 80.0);
        assert_eq!(raw(None, None).resolved_ccu(), 0.0);
    }

    #[test]
    fn test_monetization_count_from_counts() {
        let day = RawGameDay {
            game_id: 1,
            gamepass_count: Some(3),
            dev_product_count: Some(2),
            gamepass_prices: vec![10.0], // ignored when counts are present
            ..RawGameDay::default()
        };
        assert_eq!(day.monetization_count(), 5);
    }

    #[test]
    fn test_monetization_count_from_lists() {
        let day = RawGameDay {
            game_id: 1,
            gamepass_prices: vec![10.0, 25.0],
            dev_product_prices: vec![5.0],
            ..RawGameDay::default()
        };
        assert_eq!(day.monetization_count(), 3);
    }

    #[test]
    fn test_price_pool_concatenates() {
        let day = RawGameDay {
            game_id: 1,
            gamepass_prices: vec![10.0, 25.0],
            dev_product_prices: vec![5.0],
            ..RawGameDay::default()
        };
        assert_eq!(day.price_pool(), vec![10.0, 25.0, 5.0]);
    }
}
