//! Rolling/EMA feature recomputation.
//!
//! Consumes the full snapshot history and recomputes every derived
//! signal from scratch, per game, over trailing row-count windows. A
//! missing calendar day simply shrinks the effective window; nothing is
//! interpolated. The full history is recomputed on every run; there is
//! no incremental window state.

use rte_core::{FeatureRow, RollingParams, Snapshot};
use statrs::statistics::Statistics;

/// Trailing window length for coverage and the 7-row means.
const MEAN_WINDOW: usize = 7;

/// Trailing window length for the volatility signal.
const VOL_WINDOW: usize = 14;

#[inline]
fn ema_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Trailing window ending at `i` (inclusive), at most `window` rows.
#[inline]
fn trailing<'a>(series: &'a [f64], i: usize, window: usize) -> &'a [f64] {
    &series[(i + 1).saturating_sub(window)..=i]
}

/// Trailing mean requiring `min_periods` observations.
fn trailing_mean(series: &[f64], i: usize, window: usize, min_periods: usize) -> Option<f64> {
    let w = trailing(series, i, window);
    if w.len() < min_periods {
        None
    } else {
        Some(w.iter().mean())
    }
}

/// Trailing sample std dev over mean, zero-safe.
fn trailing_vol(series: &[f64], i: usize, window: usize, min_periods: usize) -> f64 {
    // Sample std dev needs at least two observations regardless of config.
    let w = trailing(series, i, window);
    if w.len() < min_periods.max(2) {
        return 0.0;
    }
    let mean = w.iter().mean();
    if mean == 0.0 {
        return 0.0;
    }
    let vol = w.iter().std_dev() / mean;
    if vol.is_finite() {
        vol
    } else {
        0.0
    }
}

/// Compute feature rows for one game's chronological snapshot run.
fn features_for_game(group: &[Snapshot], params: &RollingParams) -> Vec<FeatureRow> {
    let edr: Vec<f64> = group.iter().map(|s| s.edr_raw).collect();
    let ccu: Vec<f64> = group.iter().map(|s| s.avg_ccu).collect();

    let alpha_fast = ema_alpha(params.ema_fast);
    let alpha_slow = ema_alpha(params.ema_slow);
    let mut ema_fast = edr[0];
    let mut ema_slow = edr[0];

    let mut rows = Vec::with_capacity(group.len());
    for (i, snap) in group.iter().enumerate() {
        if i > 0 {
            ema_fast = alpha_fast * edr[i] + (1.0 - alpha_fast) * ema_fast;
            ema_slow = alpha_slow * edr[i] + (1.0 - alpha_slow) * ema_slow;
        }

        let coverage_7d = trailing(&edr, i, MEAN_WINDOW).len() as f64 / MEAN_WINDOW as f64;
        let edr_7d_mean = trailing_mean(&edr, i, MEAN_WINDOW, params.mean_7d_min_periods)
            .unwrap_or(snap.edr_raw);
        let ccu_7d_mean = trailing_mean(&ccu, i, MEAN_WINDOW, params.mean_7d_min_periods)
            .unwrap_or(snap.avg_ccu);

        let edr_mom = if ema_slow == 0.0 {
            0.0
        } else {
            let mom = ema_fast / ema_slow;
            if mom.is_finite() {
                mom
            } else {
                0.0
            }
        };

        rows.push(FeatureRow {
            snapshot: snap.clone(),
            coverage_7d,
            edr_7d_mean,
            ccu_7d_mean,
            edr_ema7: ema_fast,
            edr_ema30: ema_slow,
            edr_mom,
            edr_14d_vol: trailing_vol(&edr, i, VOL_WINDOW, params.vol_14d_min_periods),
        });
    }
    rows
}

/// Recompute rolling features over the full snapshot history.
///
/// Output has one row per input row, sorted by (game id, date)
/// ascending. Each game's series is processed independently.
pub fn compute_rolling_features(snapshots: &[Snapshot], params: &RollingParams) -> Vec<FeatureRow> {
    let mut sorted: Vec<Snapshot> = snapshots.to_vec();
    sorted.sort_by_key(|s| (s.game_id, s.snapshot_date));

    let mut rows = Vec::with_capacity(sorted.len());
    let mut games = 0usize;
    let mut start = 0usize;
    while start < sorted.len() {
        let game_id = sorted[start].game_id;
        let mut end = start;
        while end < sorted.len() && sorted[end].game_id == game_id {
            end += 1;
        }
        rows.extend(features_for_game(&sorted[start..end], params));
        games += 1;
        start = end;
    }

    tracing::debug!(games, rows = rows.len(), "recomputed rolling features");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn snap(game_id: u64, day: u32, edr_raw: f64) -> Snapshot {
        Snapshot {
            snapshot_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            game_id,
            name: None,
            developer: None,
            avg_ccu: edr_raw / 10.0,
            visits: 0.0,
            favorites: 0.0,
            likes: 0.0,
            monetization_count: 0,
            median_price: 0.0,
            price_dispersion: 0.0,
            engagement_score: 0.0,
            dau_est: 0.0,
            pcr: 0.0,
            aspu: 0.0,
            spend_revenue: 0.0,
            premium_revenue: 0.0,
            edr_raw,
        }
    }

    #[test]
    fn test_single_day_series() {
        let rows = compute_rolling_features(&[snap(1, 1, 100.0)], &RollingParams::default());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_relative_eq!(row.coverage_7d, 1.0 / 7.0);
        // Below min periods: falls back to the day's raw value.
        assert_relative_eq!(row.edr_7d_mean, 100.0);
        assert_relative_eq!(row.ccu_7d_mean, 10.0);
        // One point: both EMAs equal the input, so momentum is exactly 1.
        assert_relative_eq!(row.edr_ema7, 100.0);
        assert_relative_eq!(row.edr_ema30, 100.0);
        assert_relative_eq!(row.edr_mom, 1.0);
        assert_eq!(row.edr_14d_vol, 0.0);
    }

    #[test]
    fn test_mean_min_periods_fallback() {
        let series: Vec<Snapshot> = (1..=4).map(|d| snap(1, d, d as f64 * 10.0)).collect();
        let rows = compute_rolling_features(&series, &RollingParams::default());

        // Days 1-2 are below min_periods (3): fallback to the raw value.
        assert_relative_eq!(rows[0].edr_7d_mean, 10.0);
        assert_relative_eq!(rows[1].edr_7d_mean, 20.0);
        // Day 3 onward the window mean is defined.
        assert_relative_eq!(rows[2].edr_7d_mean, 20.0);
        assert_relative_eq!(rows[3].edr_7d_mean, 25.0);
    }

    #[test]
    fn test_window_shrinks_but_never_exceeds_seven() {
        let series: Vec<Snapshot> = (1..=9).map(|d| snap(1, d, d as f64)).collect();
        let rows = compute_rolling_features(&series, &RollingParams::default());

        assert_relative_eq!(rows[8].coverage_7d, 1.0);
        // Mean of days 3..=9.
        assert_relative_eq!(rows[8].edr_7d_mean, 6.0);
    }

    #[test]
    fn test_ema_recurrence_known_values() {
        let params = RollingParams::default();
        let series = vec![snap(1, 1, 1.0), snap(1, 2, 2.0)];
        let rows = compute_rolling_features(&series, &params);

        // alpha_fast = 2/8 = 0.25: 0.25*2 + 0.75*1 = 1.25.
        assert_relative_eq!(rows[1].edr_ema7, 1.25);
        let alpha_slow = 2.0 / 31.0;
        let expected_slow = alpha_slow * 2.0 + (1.0 - alpha_slow) * 1.0;
        assert_relative_eq!(rows[1].edr_ema30, expected_slow, epsilon = 1e-12);
        assert_relative_eq!(rows[1].edr_mom, 1.25 / expected_slow, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_series_has_unit_momentum_and_zero_vol() {
        let series: Vec<Snapshot> = (1..=10).map(|d| snap(1, d, 50.0)).collect();
        let rows = compute_rolling_features(&series, &RollingParams::default());
        for row in &rows {
            assert_relative_eq!(row.edr_mom, 1.0);
            assert_eq!(row.edr_14d_vol, 0.0);
        }
    }

    #[test]
    fn test_all_zero_series_is_zero_safe() {
        let series: Vec<Snapshot> = (1..=5).map(|d| snap(1, d, 0.0)).collect();
        let rows = compute_rolling_features(&series, &RollingParams::default());
        for row in &rows {
            assert_eq!(row.edr_mom, 0.0);
            assert_eq!(row.edr_14d_vol, 0.0);
        }
    }

    #[test]
    fn test_vol_known_value() {
        let series = vec![snap(1, 1, 100.0), snap(1, 2, 50.0)];
        let rows = compute_rolling_features(&series, &RollingParams::default());
        // Sample std of [100, 50] is 35.3553..., mean 75.
        let expected = (1250.0_f64).sqrt() / 75.0;
        assert_relative_eq!(rows[1].edr_14d_vol, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_games_are_independent() {
        // Interleaved input: the engine re-sorts and groups per game.
        let series = vec![
            snap(2, 1, 1000.0),
            snap(1, 1, 10.0),
            snap(2, 2, 2000.0),
            snap(1, 2, 20.0),
        ];
        let rows = compute_rolling_features(&series, &RollingParams::default());
        assert_eq!(rows.len(), 4);
        // Sorted by (game, date).
        assert_eq!(rows[0].game_id(), 1);
        assert_eq!(rows[1].game_id(), 1);
        assert_eq!(rows[2].game_id(), 2);
        assert_eq!(rows[3].game_id(), 2);
        // Game 1's EMA state is untouched by game 2's larger values.
        assert_relative_eq!(rows[1].edr_ema7, 0.25 * 20.0 + 0.75 * 10.0);
    }
}
