//! Metric computation engine.
//!
//! Turns a price series for one instrument into daily [`MetricRow`]s. The
//! engine is stateless: every call allocates its own accumulators, so calls
//! for different instruments can run in parallel without coordination.

use crate::rolling::{Cell, RollingWindow};
use chrono::NaiveDate;
use finsight_core::config::{MetricsConfig, ZeroVolatilityPolicy};
use finsight_core::{MetricRow, PriceObservation, Result};
use finsight_ingestion::{normalize, validate, NormalizationStats, RawPriceRecord};

/// Return window for `vol20` / `sharpe20`.
pub const SHORT_RETURN_WINDOW: usize = 20;
/// Return window for `vol60` / `sharpe60`.
pub const LONG_RETURN_WINDOW: usize = 60;
/// Close window for `sma20`.
pub const SHORT_PRICE_WINDOW: usize = 20;
/// Close window for `sma50`.
pub const LONG_PRICE_WINDOW: usize = 50;

/// Rows of history needed before the first row can be emitted.
pub const MIN_HISTORY: usize = LONG_RETURN_WINDOW;

/// Simple (arithmetic) return between two closes.
#[inline]
pub fn simple_return(prev_close: f64, close: f64) -> f64 {
    close / prev_close - 1.0
}

/// Output of one engine invocation.
#[derive(Debug, Clone, Default)]
pub struct MetricReport {
    /// Complete rows, ascending by date.
    pub rows: Vec<MetricRow>,
    /// Normalization counters.
    pub normalization: NormalizationStats,
    /// Rows with full history dropped because a cell was non-finite.
    pub non_finite_excluded: usize,
}

/// Candidate row before the completeness check.
#[derive(Debug, Clone, Copy)]
struct MetricCells {
    ret: Cell,
    vol20: Cell,
    vol60: Cell,
    sma20: Cell,
    sma50: Cell,
    sharpe20: Cell,
    sharpe60: Cell,
}

impl MetricCells {
    fn all(&self) -> [Cell; 7] {
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

    fn has_insufficient_history(&self) -> bool {
        self.all().iter().any(|c| *c == Cell::Insufficient)
    }

    fn into_row(self, date: NaiveDate) -> Option<MetricRow> {
        Some(MetricRow {
            date,
            ret: self.ret.value()?,
            vol20: self.vol20.value()?,
            vol60: self.vol60.value()?,
            sma20: self.sma20.value()?,
            sma50: self.sma50.value()?,
            sharpe20: self.sharpe20.value()?,
            sharpe60: self.sharpe60.value()?,
        })
    }
}

/// Stateless metric engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricEngine {
    config: MetricsConfig,
}

impl MetricEngine {
    /// Create a new engine from configuration.
    pub fn new(config: &MetricsConfig) -> Self {
        Self { config: *config }
    }

    /// Engine configuration.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Compute metric rows for one instrument.
    ///
    /// Input order is irrelevant. Fewer than `MIN_HISTORY + 1` distinct
    /// dates yields an empty vector.
    pub fn compute(&self, observations: &[PriceObservation]) -> Result<Vec<MetricRow>> {
        Ok(self.compute_report(observations)?.rows)
    }

    /// Validate raw records, then compute.
    pub fn compute_records(&self, records: &[RawPriceRecord]) -> Result<Vec<MetricRow>> {
        let observations = validate(records)?;
        self.compute(&observations)
    }

    /// Compute metric rows along with normalization and exclusion counters.
    pub fn compute_report(&self, observations: &[PriceObservation]) -> Result<MetricReport> {
        let series = normalize(observations, self.config.duplicate_policy)?;

        let mut ret_short = RollingWindow::new(SHORT_RETURN_WINDOW);
        let mut ret_long = RollingWindow::new(LONG_RETURN_WINDOW);
        let mut close_short = RollingWindow::new(SHORT_PRICE_WINDOW);
        let mut close_long = RollingWindow::new(LONG_PRICE_WINDOW);

        let mut rows = Vec::with_capacity(series.len().saturating_sub(MIN_HISTORY));
        let mut non_finite_excluded = 0usize;
        let mut prev_close: Option<f64> = None;

        for obs in &series.observations {
            let ret = prev_close.map(|prev| simple_return(prev, obs.close));

            // Windows still cover rows strictly before this one.
            if let Some(r) = ret {
                let cells = MetricCells {
                    ret: Cell::from_value(r),
                    vol20: ret_short.std(),
                    vol60: ret_long.std(),
                    sma20: close_short.mean(),
                    sma50: close_long.mean(),
                    sharpe20: self.sharpe(&ret_short),
                    sharpe60: self.sharpe(&ret_long),
                };
                match cells.into_row(obs.date) {
                    Some(row) => rows.push(row),
                    None if !cells.has_insufficient_history() => non_finite_excluded += 1,
                    None => {}
                }
            }

            ret_short.push(ret);
            ret_long.push(ret);
            close_short.push(Some(obs.close));
            close_long.push(Some(obs.close));
            prev_close = Some(obs.close);
        }

        if non_finite_excluded > 0 {
            tracing::warn!(
                excluded = non_finite_excluded,
                "rows dropped for non-finite metrics"
            );
        }
        tracing::debug!(
            input = series.stats.input,
            distinct = series.len(),
            rows = rows.len(),
            "computed metrics"
        );

        Ok(MetricReport {
            rows,
            normalization: series.stats,
            non_finite_excluded,
        })
    }

    /// Windowed mean return over windowed volatility.
    fn sharpe(&self, window: &RollingWindow) -> Cell {
        window.mean().zip_with(window.std(), |mean, std| {
            if std == 0.0 {
                match self.config.zero_volatility {
                    ZeroVolatilityPolicy::Exclude => Cell::NonFinite,
                    ZeroVolatilityPolicy::ZeroSentinel => Cell::Present(0.0),
                }
            } else {
                Cell::from_value(mean / std)
            }
        })
    }
}

/// Compute metric rows with the default configuration.
pub fn compute_metrics(observations: &[PriceObservation]) -> Result<Vec<MetricRow>> {
    MetricEngine::default().compute(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use finsight_core::config::DuplicatePolicy;
    use statrs::statistics::Statistics;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn series(closes: &[f64]) -> Vec<PriceObservation> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceObservation::new(day(i), c))
            .collect()
    }

    fn linear(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.5 * i as f64).collect()
    }

    fn returns(closes: &[f64]) -> Vec<f64> {
        closes.windows(2).map(|w| simple_return(w[0], w[1])).collect()
    }

    #[test]
    fn test_synthetic_series_length() {
        let closes = linear(130);
        let rows = compute_metrics(&series(&closes)).unwrap();

        assert_eq!(rows.len(), 70);
        assert_eq!(rows[0].date, day(60));
        assert_eq!(rows.last().unwrap().date, day(129));
        assert!(rows.iter().all(MetricRow::is_finite));
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_synthetic_returns_decrease() {
        let rows = compute_metrics(&series(&linear(130))).unwrap();
        for (k, row) in rows.iter().enumerate() {
            let i = 60 + k;
            let expected = 0.5 / (100.0 + 0.5 * (i as f64 - 1.0));
            assert_relative_eq!(row.ret, expected, max_relative = 1e-9);
        }
        assert!(rows.windows(2).all(|w| w[1].ret < w[0].ret));
    }

    #[test]
    fn test_first_row_values() {
        let closes = linear(130);
        let rets = returns(&closes); // rets[j] is the return at position j + 1
        let rows = compute_metrics(&series(&closes)).unwrap();
        let row = rows[0]; // position 60

        // Close windows: positions 40..=59 and 10..=59.
        assert_relative_eq!(row.sma20, 124.75, max_relative = 1e-12);
        assert_relative_eq!(row.sma50, 117.25, max_relative = 1e-12);

        // Return windows: rows 40..=59 and 0..=59, row 0 has no return.
        let short = &rets[39..59];
        let long = &rets[0..59];
        assert_relative_eq!(row.vol20, short.std_dev(), max_relative = 1e-9);
        assert_relative_eq!(row.vol60, long.std_dev(), max_relative = 1e-9);
        assert_relative_eq!(
            row.sharpe20,
            short.mean() / short.std_dev(),
            max_relative = 1e-9
        );
        assert_relative_eq!(
            row.sharpe60,
            long.mean() / long.std_dev(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_later_row_uses_full_windows() {
        let closes = linear(130);
        let rets = returns(&closes);
        let rows = compute_metrics(&series(&closes)).unwrap();
        let row = rows[40]; // position 100
        assert_eq!(row.date, day(100));

        let long = &rets[39..99]; // returns at positions 40..=99
        assert_relative_eq!(row.vol60, long.std_dev(), max_relative = 1e-9);
        let sma50 = closes[50..100].mean();
        assert_relative_eq!(row.sma50, sma50, max_relative = 1e-12);
    }

    #[test]
    fn test_undersized_input() {
        assert!(compute_metrics(&[]).unwrap().is_empty());
        assert!(compute_metrics(&series(&linear(1))).unwrap().is_empty());
        assert!(compute_metrics(&series(&linear(60))).unwrap().is_empty());
        assert_eq!(compute_metrics(&series(&linear(61))).unwrap().len(), 1);
    }

    #[test]
    fn test_order_independence() {
        let mut obs = series(&linear(90));
        let sorted = compute_metrics(&obs).unwrap();
        obs.reverse();
        obs.swap(3, 40);
        assert_eq!(compute_metrics(&obs).unwrap(), sorted);
    }

    #[test]
    fn test_flat_series_excluded_by_default() {
        let closes = vec![50.0; 80];
        let report = MetricEngine::default().compute_report(&series(&closes)).unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.non_finite_excluded, 20);
    }

    #[test]
    fn test_flat_series_zero_sentinel() {
        let config = MetricsConfig {
            zero_volatility: ZeroVolatilityPolicy::ZeroSentinel,
            ..Default::default()
        };
        let rows = MetricEngine::new(&config)
            .compute(&series(&vec![50.0; 80]))
            .unwrap();
        assert_eq!(rows.len(), 20);
        for row in rows {
            assert_eq!(row.ret, 0.0);
            assert_eq!(row.vol20, 0.0);
            assert_eq!(row.vol60, 0.0);
            assert_eq!(row.sharpe20, 0.0);
            assert_eq!(row.sharpe60, 0.0);
            assert_eq!(row.sma20, 50.0);
            assert_eq!(row.sma50, 50.0);
        }
    }

    /// 120 oscillating closes, then the price stops moving.
    fn volatile_then_flat() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..120)
            .map(|i| ((100.0 + 5.0 * (i as f64 * 0.7).sin()) * 100.0).round() / 100.0)
            .collect();
        closes.extend(std::iter::repeat(123.45).take(100));
        closes
    }

    #[test]
    fn test_flat_tail_after_movement_excluded() {
        // Returns are zero from position 121, so 20-row return windows are
        // flat from position 141 on.
        let report = MetricEngine::default()
            .compute_report(&series(&volatile_then_flat()))
            .unwrap();

        assert_eq!(report.rows.len(), 81);
        assert_eq!(report.non_finite_excluded, 79);
        assert_eq!(report.rows.last().unwrap().date, day(140));
        assert!(report.rows.iter().all(|r| r.vol20 > 0.0));
    }

    #[test]
    fn test_flat_tail_after_movement_zero_sentinel() {
        let config = MetricsConfig {
            zero_volatility: ZeroVolatilityPolicy::ZeroSentinel,
            ..Default::default()
        };
        let rows = MetricEngine::new(&config)
            .compute(&series(&volatile_then_flat()))
            .unwrap();
        assert_eq!(rows.len(), 160);

        for row in &rows {
            if row.date >= day(141) {
                assert_eq!(row.vol20, 0.0);
                assert_eq!(row.sharpe20, 0.0);
                assert_eq!(row.sma20, 123.45);
            } else {
                assert!(row.vol20 > 0.0);
            }
            if row.date >= day(181) {
                assert_eq!(row.vol60, 0.0);
                assert_eq!(row.sharpe60, 0.0);
            }
        }
    }

    #[test]
    fn test_duplicate_keep_last() {
        let closes = linear(70);
        let mut obs = series(&closes);
        // An earlier, conflicting copy of day 65 is overridden by the later one.
        obs.insert(0, PriceObservation::new(day(65), 1.0));
        let rows = compute_metrics(&obs).unwrap();
        assert_eq!(rows, compute_metrics(&series(&closes)).unwrap());
        assert_eq!(rows.len(), 10);
    }

    #[test]
    fn test_duplicate_reject() {
        let config = MetricsConfig {
            duplicate_policy: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let mut obs = series(&linear(70));
        obs.push(PriceObservation::new(day(5), 1.0));
        let err = MetricEngine::new(&config).compute(&obs).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_zero_close_poisons_windows() {
        let mut closes = linear(200);
        closes[99] = 0.0;
        let report = MetricEngine::default().compute_report(&series(&closes)).unwrap();

        // Return at 99 is -1 (finite); return at 100 is infinite and sits in
        // the 60-row return window for rows 101..=160.
        assert!(report.rows.iter().all(MetricRow::is_finite));
        let dates: Vec<NaiveDate> = report.rows.iter().map(|r| r.date).collect();
        assert!(dates.contains(&day(99)));
        assert!(!dates.contains(&day(100)));
        assert!(!dates.contains(&day(160)));
        assert!(dates.contains(&day(161)));
        assert_eq!(report.rows.len(), 140 - 61);
        assert_eq!(report.non_finite_excluded, 61);
    }

    #[test]
    fn test_missing_close_is_invalid_input() {
        let mut records: Vec<RawPriceRecord> = (0..70)
            .map(|i| RawPriceRecord::new(day(i), 100.0 + i as f64))
            .collect();
        records[10].close = None;
        let err = MetricEngine::default().compute_records(&records).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_compute_records() {
        let records: Vec<RawPriceRecord> = linear(65)
            .into_iter()
            .enumerate()
            .map(|(i, c)| RawPriceRecord::new(day(i).format("%Y-%m-%d").to_string().as_str(), c))
            .collect();
        let rows = MetricEngine::default().compute_records(&records).unwrap();
        assert_eq!(rows.len(), 5);
    }
}
