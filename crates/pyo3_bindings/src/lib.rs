//! PyO3 bindings for the finsight metric engine.
//!
//! Exposes to Python:
//! - Price observations and metric rows
//! - The rolling metric engine with its policies
//! - Descriptive price statistics

use chrono::NaiveDate;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use finsight_types::{
    config::MetricsConfig,
    Error as RustError, MetricRow as RustMetricRow, PriceObservation as RustPriceObservation,
    DATE_FORMAT,
};
use finsight_features::{MetricEngine as RustMetricEngine, PriceSummary as RustPriceSummary};
use finsight_ingestion::{parse_date, DateInput, RawPriceRecord};

fn to_py_err(e: RustError) -> PyErr {
    if e.is_invalid_input() {
        PyValueError::new_err(e.to_string())
    } else {
        PyRuntimeError::new_err(e.to_string())
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// One dated close.
#[pyclass]
#[derive(Clone)]
pub struct PriceObservation {
    #[pyo3(get, set)]
    pub date: String,
    #[pyo3(get, set)]
    pub close: f64,
}

#[pymethods]
impl PriceObservation {
    #[new]
    fn new(date: String, close: f64) -> Self {
        PriceObservation { date, close }
    }

    fn __repr__(&self) -> String {
        format!("PriceObservation(date={}, close={})", self.date, self.close)
    }
}

impl PriceObservation {
    fn to_rust(&self) -> PyResult<RustPriceObservation> {
        let date = parse_date(&self.date).map_err(to_py_err)?;
        Ok(RustPriceObservation::new(date, self.close))
    }
}

/// Metrics for one anchor date. `ret` is exported as `return` by `to_dict`.
#[pyclass]
#[derive(Clone)]
pub struct MetricRow {
    #[pyo3(get)]
    pub date: String,
    #[pyo3(get)]
    pub ret: f64,
    #[pyo3(get)]
    pub vol20: f64,
    #[pyo3(get)]
    pub vol60: f64,
    #[pyo3(get)]
    pub sma20: f64,
    #[pyo3(get)]
    pub sma50: f64,
    #[pyo3(get)]
    pub sharpe20: f64,
    #[pyo3(get)]
    pub sharpe60: f64,
}

#[pymethods]
impl MetricRow {
    /// Row as a dict keyed by output column name.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("date", &self.date)?;
        dict.set_item("return", self.ret)?;
        dict.set_item("vol20", self.vol20)?;
        dict.set_item("vol60", self.vol60)?;
        dict.set_item("sma20", self.sma20)?;
        dict.set_item("sma50", self.sma50)?;
        dict.set_item("sharpe20", self.sharpe20)?;
        dict.set_item("sharpe60", self.sharpe60)?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "MetricRow(date={}, return={:.6}, vol20={:.6}, sma20={:.4}, sharpe20={:.4})",
            self.date, self.ret, self.vol20, self.sma20, self.sharpe20
        )
    }
}

impl From<RustMetricRow> for MetricRow {
    fn from(r: RustMetricRow) -> Self {
        MetricRow {
            date: format_date(r.date),
            ret: r.ret,
            vol20: r.vol20,
            vol60: r.vol60,
            sma20: r.sma20,
            sma50: r.sma50,
            sharpe20: r.sharpe20,
            sharpe60: r.sharpe60,
        }
    }
}

/// Descriptive statistics of a price series.
#[pyclass]
#[derive(Clone)]
pub struct PriceSummary {
    #[pyo3(get)]
    pub count: usize,
    #[pyo3(get)]
    pub mean: f64,
    #[pyo3(get)]
    pub median: f64,
    #[pyo3(get)]
    pub std_dev: Option<f64>,
    #[pyo3(get)]
    pub min: f64,
    #[pyo3(get)]
    pub max: f64,
}

#[pymethods]
impl PriceSummary {
    fn __repr__(&self) -> String {
        format!(
            "PriceSummary(count={}, mean={:.4}, median={:.4}, min={:.4}, max={:.4})",
            self.count, self.mean, self.median, self.min, self.max
        )
    }
}

impl From<RustPriceSummary> for PriceSummary {
    fn from(s: RustPriceSummary) -> Self {
        PriceSummary {
            count: s.count,
            mean: s.mean,
            median: s.median,
            std_dev: s.std_dev,
            min: s.min,
            max: s.max,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

fn parse_policy<T: std::str::FromStr<Err = RustError>>(s: &str) -> PyResult<T> {
    s.parse().map_err(|e: RustError| PyValueError::new_err(e.to_string()))
}

fn to_rust_observations(observations: &[PriceObservation]) -> PyResult<Vec<RustPriceObservation>> {
    observations.iter().map(PriceObservation::to_rust).collect()
}

fn rows_to_py(rows: Vec<RustMetricRow>) -> Vec<MetricRow> {
    rows.into_iter().map(MetricRow::from).collect()
}

/// Rolling metric engine.
#[pyclass(name = "MetricEngine")]
pub struct PyMetricEngine {
    inner: RustMetricEngine,
}

#[pymethods]
impl PyMetricEngine {
    #[new]
    #[pyo3(signature = (duplicate_policy = "keep_last", zero_volatility = "exclude"))]
    fn new(duplicate_policy: &str, zero_volatility: &str) -> PyResult<Self> {
        let config = MetricsConfig {
            duplicate_policy: parse_policy(duplicate_policy)?,
            zero_volatility: parse_policy(zero_volatility)?,
        };
        Ok(PyMetricEngine {
            inner: RustMetricEngine::new(&config),
        })
    }

    /// Compute metric rows from observations in any order.
    fn compute(&self, observations: Vec<PriceObservation>) -> PyResult<Vec<MetricRow>> {
        let observations = to_rust_observations(&observations)?;
        let rows = self.inner.compute(&observations).map_err(to_py_err)?;
        Ok(rows_to_py(rows))
    }

    /// Compute metric rows from parallel date and close columns.
    ///
    /// A `None` in either column raises `ValueError`.
    fn compute_columns(
        &self,
        dates: Vec<Option<String>>,
        closes: Vec<Option<f64>>,
    ) -> PyResult<Vec<MetricRow>> {
        if dates.len() != closes.len() {
            return Err(PyValueError::new_err(format!(
                "dates and closes differ in length ({} vs {})",
                dates.len(),
                closes.len()
            )));
        }
        let records: Vec<RawPriceRecord> = dates
            .into_iter()
            .zip(closes)
            .map(|(date, close)| RawPriceRecord {
                date: date.map(DateInput::Text),
                close,
            })
            .collect();
        let rows = self.inner.compute_records(&records).map_err(to_py_err)?;
        Ok(rows_to_py(rows))
    }

    fn __repr__(&self) -> String {
        let config = self.inner.config();
        format!(
            "MetricEngine(duplicate_policy={:?}, zero_volatility={:?})",
            config.duplicate_policy, config.zero_volatility
        )
    }
}

/// Compute metric rows with the default engine.
#[pyfunction]
fn compute_metrics(observations: Vec<PriceObservation>) -> PyResult<Vec<MetricRow>> {
    let observations = to_rust_observations(&observations)?;
    let rows = finsight_features::compute_metrics(&observations).map_err(to_py_err)?;
    Ok(rows_to_py(rows))
}

/// Count, mean, median, sample std, min and max of a price list.
#[pyfunction]
fn summarize_prices(prices: Vec<f64>) -> PyResult<PriceSummary> {
    finsight_features::summarize_prices(&prices)
        .map(PriceSummary::from)
        .map_err(to_py_err)
}

// ============================================================================
// Module Definition
// ============================================================================

/// finsight core: rolling price metrics implemented in Rust.
#[pymodule]
#[pyo3(name = "finsight_core")]
fn finsight_core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<PriceObservation>()?;
    m.add_class::<MetricRow>()?;
    m.add_class::<PriceSummary>()?;

    // Engine
    m.add_class::<PyMetricEngine>()?;
    m.add_function(wrap_pyfunction!(compute_metrics, m)?)?;
    m.add_function(wrap_pyfunction!(summarize_prices, m)?)?;

    Ok(())
}
