//! Feature computation for the EDR index engine.
//!
//! This crate handles:
//! - Daily EDR estimation (revenue-proxy columns per game per day)
//! - Rolling/EMA feature recomputation over the full snapshot history

pub mod edr;
pub mod rolling;

pub use edr::compute_edr_daily;
pub use rolling::compute_rolling_features;
