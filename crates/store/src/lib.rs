//! Persistence for the finsight system.
//!
//! This crate provides:
//! - SQLite storage of prices and metric rows keyed by `(ticker, date)`
//! - Latest-row-per-ticker and per-ticker listing reads
//! - Database summary counts
//! - The compute-and-persist refresh pipeline

pub mod schema;
pub mod store;
pub mod refresh;

pub use store::{MetricStore, StoreSummary};
pub use refresh::{
    recompute_ticker, refresh_all, refresh_ticker, RefreshError, RefreshOutcome, RefreshReport,
};
