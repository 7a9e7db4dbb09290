//! Compute-and-persist pipeline.
//!
//! Glues the metric engine to the store: price bars go in, metric rows are
//! recomputed from the full series and upserted. Recomputation overwrites
//! existing rows for the same `(ticker, date)`.

use crate::store::MetricStore;
use finsight_core::{normalize_ticker, DailyBar, Result};
use finsight_features::MetricEngine;
use finsight_ingestion::normalize_bars;
use serde::Serialize;

/// Result of refreshing one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub ticker: String,
    pub prices_written: usize,
    pub metrics_written: usize,
}

/// A ticker that failed during a bulk refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshError {
    pub ticker: String,
    pub error: String,
}

/// Result of refreshing every tracked ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub processed: usize,
    pub errors: Vec<RefreshError>,
}

impl RefreshReport {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Store new bars for `ticker` and recompute its metrics from them.
///
/// Metrics are computed before anything is written, so malformed input
/// leaves the store untouched.
pub fn refresh_ticker(
    store: &mut MetricStore,
    engine: &MetricEngine,
    ticker: &str,
    bars: &[DailyBar],
) -> Result<RefreshOutcome> {
    let ticker = normalize_ticker(ticker);
    let bars = normalize_bars(bars, engine.config().duplicate_policy)?;
    let observations: Vec<_> = bars.iter().map(DailyBar::observation).collect();
    let rows = engine.compute(&observations)?;

    let prices_written = store.upsert_prices(&ticker, &bars)?;
    let metrics_written = store.upsert_metrics(&ticker, &rows)?;

    tracing::info!(
        ticker = %ticker,
        prices = prices_written,
        metrics = metrics_written,
        "refreshed ticker"
    );
    Ok(RefreshOutcome {
        ticker,
        prices_written,
        metrics_written,
    })
}

/// Recompute metrics for `ticker` from its stored prices.
pub fn recompute_ticker(
    store: &mut MetricStore,
    engine: &MetricEngine,
    ticker: &str,
) -> Result<RefreshOutcome> {
    let ticker = normalize_ticker(ticker);
    let observations = store.observations_for(&ticker)?;
    let rows = engine.compute(&observations)?;
    let metrics_written = store.upsert_metrics(&ticker, &rows)?;

    tracing::info!(ticker = %ticker, metrics = metrics_written, "recomputed ticker");
    Ok(RefreshOutcome {
        ticker,
        prices_written: 0,
        metrics_written,
    })
}

/// Recompute every tracked ticker; failures are collected, not propagated.
pub fn refresh_all(store: &mut MetricStore, engine: &MetricEngine) -> Result<RefreshReport> {
    let mut report = RefreshReport::default();
    for ticker in store.tracked_tickers()? {
        match recompute_ticker(store, engine, &ticker) {
            Ok(_) => report.processed += 1,
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "refresh failed");
                report.errors.push(RefreshError {
                    ticker,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}
