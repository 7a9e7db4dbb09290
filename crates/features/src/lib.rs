//! Metric computation for the finsight system.
//!
//! This crate handles:
//! - Trailing, look-ahead-free rolling accumulators
//! - Daily return, volatility, moving average and sharpe rows
//! - Descriptive price statistics

pub mod rolling;
pub mod engine;
pub mod summary;

pub use rolling::{Cell, RollingWindow};
pub use engine::{compute_metrics, MetricEngine, MetricReport, MIN_HISTORY};
pub use summary::{summarize_prices, PriceSummary};
