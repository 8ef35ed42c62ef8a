//! Data ingestion and normalization for the EDR index engine.
//!
//! This crate handles:
//! - Run-file discovery (dated snapshot directories on disk)
//! - Raw JSON shape normalization into uniform per-game rows

pub mod discovery;
pub mod normalize;

pub use discovery::discover_run_files;
pub use normalize::load_run_file;
