//! Core data types for the finsight system.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ISO calendar date format used for storage and display.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize a ticker symbol: surrounding whitespace removed, uppercased.
#[inline]
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// One trading day's closing price for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
}

impl PriceObservation {
    /// Create a new observation.
    #[inline]
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily OHLCV bar as persisted by the store.
///
/// Only `close` takes part in metric computation; the other fields are
/// carried through when the source provides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading date.
    pub date: NaiveDate,
    /// Open price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    pub volume: Option<f64>,
}

impl DailyBar {
    /// A bar carrying only a close.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// The observation used by the metric engine.
    #[inline]
    pub fn observation(&self) -> PriceObservation {
        PriceObservation::new(self.date, self.close)
    }
}

/// Derived indicator set anchored at `date`.
///
/// Rolling fields use only rows strictly before `date`; `ret` is the
/// date's own simple return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Anchor date.
    pub date: NaiveDate,
    /// Simple return `close[t] / close[t-1] - 1`.
    #[serde(rename = "return")]
    pub ret: f64,
    /// Sample std of returns, 20 prior rows.
    pub vol20: f64,
    /// Sample std of returns, 60 prior rows.
    pub vol60: f64,
    /// Mean close, 20 prior rows.
    pub sma20: f64,
    /// Mean close, 50 prior rows.
    pub sma50: f64,
    /// Mean return / vol20 over the same window.
    pub sharpe20: f64,
    /// Mean return / vol60 over the same window.
    pub sharpe60: f64,
}

impl MetricRow {
    /// Numeric fields in schema order.
    pub fn values(&self) -> [f64; 7] {
        [
            self.ret,
            self.vol20,
            self.vol60,
            self.sma20,
            self.sma50,
            self.sharpe20,
            self.sharpe60,
        ]
    }

    /// True when every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }
}

/// A metric row tagged with its instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMetricRow {
    /// Normalized ticker symbol.
    pub ticker: String,
    /// The row.
    #[serde(flatten)]
    pub row: MetricRow,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_row() -> MetricRow {
        MetricRow {
            date: date(2024, 3, 1),
            ret: 0.01,
            vol20: 0.02,
            vol60: 0.03,
            sma20: 101.0,
            sma50: 100.0,
            sharpe20: 0.5,
            sharpe60: 0.33,
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  aapl "), "AAPL");
        assert_eq!(normalize_ticker("BRK.b"), "BRK.B");
    }

    #[test]
    fn test_row_finite() {
        let mut row = sample_row();
        assert!(row.is_finite());
        row.sharpe20 = f64::NAN;
        assert!(!row.is_finite());
        row.sharpe20 = f64::INFINITY;
        assert!(!row.is_finite());
    }

    #[test]
    fn test_row_serializes_return_key() {
        let json = serde_json::to_value(sample_row()).unwrap();
        assert_eq!(json["date"], "2024-03-01");
        assert!((json["return"].as_f64().unwrap() - 0.01).abs() < 1e-12);
        assert!(json.get("ret").is_none());
    }

    #[test]
    fn test_ticker_row_flattens() {
        let tagged = TickerMetricRow {
            ticker: "SPY".to_string(),
            row: sample_row(),
        };
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["ticker"], "SPY");
        assert_eq!(json["sma50"], 100.0);
    }

    #[test]
    fn test_bar_observation() {
        let bar = DailyBar::from_close(date(2024, 1, 2), 42.5);
        assert_eq!(bar.observation(), PriceObservation::new(date(2024, 1, 2), 42.5));
        assert!(bar.open.is_none());
    }
}
