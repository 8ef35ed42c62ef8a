//! Core types and configuration for the EDR index engine.
//!
//! This crate provides shared types used across all other crates:
//! - Table row types (snapshots, feature rows, membership, index points)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, EdrParams, IndexParams, RebalanceParams, RollingParams, StorageParams};
pub use error::{Error, Result};
pub use types::*;
