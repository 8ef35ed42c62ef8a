//! Configuration structures for the EDR index engine.
//!
//! Five immutable parameter groups passed by value into every stage.
//! No stage carries hidden defaults of its own.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Main configuration for the index engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// EDR estimator coefficients and caps.
    pub edr: EdrParams,
    /// Rolling-window sizes and minimum periods.
    pub rolling: RollingParams,
    /// Rebalance thresholds and target size.
    pub rebalance: RebalanceParams,
    /// Index-level compounding parameters.
    pub index: IndexParams,
    /// Storage locations.
    pub storage: StorageParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            edr: EdrParams::default(),
            rolling: RollingParams::default(),
            rebalance: RebalanceParams::default(),
            index: IndexParams::default(),
            storage: StorageParams::default(),
        }
    }
}

/// EDR estimator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdrParams {
    /// DAU ~= alpha * avg CCU.
    pub alpha: f64,
    /// PCR = base_rate * ln(1 + monetization_count).
    pub base_rate: f64,
    /// Premium revenue proxy scaling.
    pub gamma: f64,
    /// Lower clip for the payer-conversion-rate proxy.
    pub pcr_floor: f64,
    /// Upper clip for the payer-conversion-rate proxy.
    pub pcr_cap: f64,
    /// Engagement proxy scaling.
    pub engagement_scale: f64,
    /// Engagement proxy cap.
    pub engagement_cap: f64,
}

impl Default for EdrParams {
    fn default() -> Self {
        Self {
            alpha: 20.0,
            base_rate: 0.01,
            gamma: 0.02,
            pcr_floor: 0.001,
            pcr_cap: 0.05,
            engagement_scale: 50.0,
            engagement_cap: 1.5,
        }
    }
}

/// Rolling feature parameters (daily sampling).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingParams {
    /// Minimum observations for the 7-row means.
    pub mean_7d_min_periods: usize,
    /// Minimum observations for the 14-row volatility.
    pub vol_14d_min_periods: usize,
    /// Fast EMA span.
    pub ema_fast: usize,
    /// Slow EMA span.
    pub ema_slow: usize,
}

impl Default for RollingParams {
    fn default() -> Self {
        Self {
            mean_7d_min_periods: 3,
            vol_14d_min_periods: 2,
            ema_fast: 7,
            ema_slow: 30,
        }
    }
}

/// Weekly rebalance parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceParams {
    /// Rebalance weekday: Monday = 0 ... Sunday = 6.
    pub rebalance_weekday: u8,
    /// Non-members enter when rank <= enter_rank.
    pub enter_rank: u32,
    /// Members stay while rank <= exit_rank (the wider band).
    pub exit_rank: u32,
    /// Minimum `coverage_7d` to be eligible at rebalance time.
    pub min_coverage_7d: f64,
    /// Target number of constituents.
    pub n_constituents: usize,
}

impl Default for RebalanceParams {
    fn default() -> Self {
        Self {
            rebalance_weekday: 0,
            enter_rank: 90,
            exit_rank: 130,
            min_coverage_7d: 0.0,
            n_constituents: 100,
        }
    }
}

impl RebalanceParams {
    /// Whether `date` falls on the configured rebalance weekday.
    #[inline]
    pub fn is_rebalance_day(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_monday() == self.rebalance_weekday as u32
    }
}

/// Index-level compounding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexParams {
    /// Seed level for the compounded series.
    pub base_level: f64,
    /// Stabilizer added to EDR before taking log returns.
    pub eps: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            base_level: 1000.0,
            eps: 1.0,
        }
    }
}

/// Storage locations for the derived tables and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageParams {
    /// Directory holding all derived data.
    pub index_data_dir: String,
    /// Snapshot table file name.
    pub snapshots_file: String,
    /// Feature table file name.
    pub features_file: String,
    /// Membership table file name.
    pub membership_file: String,
    /// Exports subdirectory name.
    pub exports_dir: String,
    /// File-name prefix for exported tables.
    pub export_prefix: String,
}

impl Default for StorageParams {
    fn default() -> Self {
        Self {
            index_data_dir: "index_data".to_string(),
            snapshots_file: "snapshots.json".to_string(),
            features_file: "features.json".to_string(),
            membership_file: "membership.json".to_string(),
            exports_dir: "exports".to_string(),
            export_prefix: "rte100".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.edr.alpha, 20.0);
        assert_eq!(config.rolling.mean_7d_min_periods, 3);
        assert_eq!(config.rebalance.n_constituents, 100);
        assert_eq!(config.index.base_level, 1000.0);
    }

    #[test]
    fn test_hysteresis_band_is_ordered() {
        let params = RebalanceParams::default();
        assert!(params.enter_rank < params.exit_rank);
    }

    #[test]
    fn test_is_rebalance_day() {
        let params = RebalanceParams::default(); // Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(params.is_rebalance_day(monday));
        assert!(!params.is_rebalance_day(tuesday));
    }
}
