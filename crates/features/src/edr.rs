//! Daily EDR estimation.
//!
//! A pure per-day transform: one day's normalized attribute rows in,
//! the same rows augmented with derived revenue-proxy columns out.
//! No cross-day state, no side effects; every missing input defaults
//! instead of failing.

use chrono::NaiveDate;
use rte_core::{EdrParams, RawGameDay, Snapshot};
use statrs::statistics::{Data, Median, Statistics};

/// Zero-safe division: 0 when the denominator is 0 or the result is not finite.
#[inline]
fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return 0.0;
    }
    let v = a / b;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[inline]
fn clip(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Median of the pooled price list; 0 when empty.
fn median_price(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        0.0
    } else {
        Data::new(prices.to_vec()).median()
    }
}

/// Population std dev of prices divided by their mean; 0 when the mean
/// is non-positive or the list is empty.
fn price_dispersion(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let mean = prices.iter().mean();
    if mean <= 0.0 {
        return 0.0;
    }
    prices.iter().population_std_dev() / mean
}

/// Derive one snapshot row from one game's raw attributes.
fn estimate(row: &RawGameDay, snapshot_date: NaiveDate, params: &EdrParams) -> Snapshot {
    let avg_ccu = row.resolved_ccu();
    let visits = row.visits.unwrap_or(0.0);
    let favorites = row.favorites.unwrap_or(0.0);
    let likes = row.likes.unwrap_or(0.0);
    let monetization_count = row.monetization_count();
    let prices = row.price_pool();

    let median_price = median_price(&prices);
    let price_dispersion = price_dispersion(&prices);

    let favorite_rate = safe_div(favorites, visits);
    let like_rate = safe_div(likes, visits);
    let engagement_score = clip(
        params.engagement_scale * 0.5 * (favorite_rate + like_rate),
        0.0,
        params.engagement_cap,
    );

    let dau_est = (params.alpha * avg_ccu).max(0.0);
    // ln(1 + x) for x >= 0 is always >= 0, so only the clip bounds apply.
    let pcr = clip(
        params.base_rate * (1.0 + monetization_count as f64).ln(),
        params.pcr_floor,
        params.pcr_cap,
    );
    let aspu = (median_price * (1.0 + price_dispersion)).max(0.0);

    let spend_revenue = dau_est * pcr * aspu;
    let premium_revenue = params.gamma * dau_est * engagement_score;
    let edr_raw = (spend_revenue + premium_revenue).max(0.0);

    Snapshot {
        snapshot_date,
        game_id: row.game_id,
        name: row.name.clone(),
        developer: row.developer.clone(),
        avg_ccu,
        visits,
        favorites,
        likes,
        monetization_count,
        median_price,
        price_dispersion,
        engagement_score,
        dau_est,
        pcr,
        aspu,
        spend_revenue,
        premium_revenue,
        edr_raw,
    }
}

/// Compute the EDR columns for one day's universe of games.
pub fn compute_edr_daily(
    rows: &[RawGameDay],
    snapshot_date: NaiveDate,
    params: &EdrParams,
) -> Vec<Snapshot> {
    rows.iter()
        .map(|row| estimate(row, snapshot_date, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn base_row() -> RawGameDay {
        RawGameDay {
            game_id: 1,
            avg_ccu: Some(100.0),
            visits: Some(10_000.0),
            favorites: Some(200.0),
            likes: Some(100.0),
            gamepass_prices: vec![10.0, 20.0, 30.0],
            ..RawGameDay::default()
        }
    }

    #[test]
    fn test_pcr_stays_clipped_for_all_counts() {
        let params = EdrParams::default();
        for count in [0u64, 1, 5, 100, 10_000, 1_000_000] {
            let row = RawGameDay {
                game_id: 1,
                gamepass_count: Some(count),
                ..RawGameDay::default()
            };
            let snap = estimate(&row, date(), &params);
            assert!(snap.pcr >= params.pcr_floor, "count {count}");
            assert!(snap.pcr <= params.pcr_cap, "count {count}");
        }
    }

    #[test]
    fn test_zero_visits_yields_zero_engagement() {
        let params = EdrParams::default();
        let row = RawGameDay {
            game_id: 1,
            visits: Some(0.0),
            favorites: Some(500.0),
            likes: Some(300.0),
            ..RawGameDay::default()
        };
        let snap = estimate(&row, date(), &params);
        assert_eq!(snap.engagement_score, 0.0);
        assert!(snap.edr_raw.is_finite());
    }

    #[test]
    fn test_missing_everything_defaults_to_zero_revenue() {
        let params = EdrParams::default();
        let row = RawGameDay {
            game_id: 1,
            ..RawGameDay::default()
        };
        let snap = estimate(&row, date(), &params);
        assert_eq!(snap.avg_ccu, 0.0);
        assert_eq!(snap.dau_est, 0.0);
        assert_eq!(snap.aspu, 0.0);
        assert_eq!(snap.edr_raw, 0.0);
        // The floor still applies to an empty monetization surface.
        assert_eq!(snap.pcr, params.pcr_floor);
    }

    #[test]
    fn test_median_and_dispersion() {
        assert_eq!(median_price(&[]), 0.0);
        assert_relative_eq!(median_price(&[10.0, 20.0, 30.0]), 20.0);
        assert_relative_eq!(median_price(&[10.0, 20.0]), 15.0);

        assert_eq!(price_dispersion(&[]), 0.0);
        // Population std of [10, 20] is 5, mean 15.
        assert_relative_eq!(price_dispersion(&[10.0, 20.0]), 5.0 / 15.0, epsilon = 1e-12);
        // All-zero prices: mean 0 guards the division.
        assert_eq!(price_dispersion(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_known_edr_decomposition() {
        let params = EdrParams::default();
        let snap = estimate(&base_row(), date(), &params);

        assert_relative_eq!(snap.dau_est, 2000.0);
        // favorite_rate 0.02, like_rate 0.01 -> 50 * 0.5 * 0.03 = 0.75.
        assert_relative_eq!(snap.engagement_score, 0.75);
        // 3 items: 0.01 * ln(4) ~= 0.01386, within [floor, cap].
        assert_relative_eq!(snap.pcr, 0.01 * 4.0_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(snap.median_price, 20.0);
        assert_relative_eq!(
            snap.spend_revenue,
            snap.dau_est * snap.pcr * snap.aspu,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            snap.premium_revenue,
            params.gamma * snap.dau_est * snap.engagement_score,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            snap.edr_raw,
            snap.spend_revenue + snap.premium_revenue,
            epsilon = 1e-9
        );
        assert!(snap.edr_raw > 0.0);
    }

    #[test]
    fn test_engagement_cap_applies() {
        let params = EdrParams::default();
        let row = RawGameDay {
            game_id: 1,
            visits: Some(10.0),
            favorites: Some(10.0),
            likes: Some(10.0),
            ..RawGameDay::default()
        };
        let snap = estimate(&row, date(), &params);
        assert_eq!(snap.engagement_score, params.engagement_cap);
    }

    #[test]
    fn test_batch_preserves_order_and_date() {
        let params = EdrParams::default();
        let rows = vec![
            RawGameDay {
                game_id: 2,
                ..RawGameDay::default()
            },
            base_row(),
        ];
        let snaps = compute_edr_daily(&rows, date(), &params);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].game_id, 2);
        assert_eq!(snaps[1].game_id, 1);
        assert!(snaps.iter().all(|s| s.snapshot_date == date()));
    }
}
