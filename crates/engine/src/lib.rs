//! Rebalancing, index construction and orchestration for the EDR index
//! engine.
//!
//! This crate provides:
//! - Cross-sectional percentile ranking and the weekly selection engine
//! - Index-level compounding from snapshots + membership history
//! - JSON table persistence for the derived stores
//! - Human-readable exports and the weekly markdown report
//! - The pipeline wiring all stages together

pub mod export;
pub mod index_level;
pub mod pipeline;
pub mod ranking;
pub mod rebalance;
pub mod report;
pub mod store;

pub use export::{export_rebalance_outputs, latest_snapshots_asof, write_index_level_exports};
pub use index_level::build_index_level_series;
pub use pipeline::run_pipeline;
pub use rebalance::{rebalance_weekly, RebalanceResult};
pub use report::write_weekly_report;
pub use store::Store;
