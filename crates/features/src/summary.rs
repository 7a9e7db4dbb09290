//! Descriptive statistics over a close-price series.

use finsight_core::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Summary of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` below two prices.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Summarize a series of prices.
pub fn summarize_prices(prices: &[f64]) -> Result<PriceSummary> {
    if prices.is_empty() {
        return Err(Error::invalid_input("price data cannot be empty"));
    }

    let std_dev = if prices.len() >= 2 {
        Some(Statistics::std_dev(prices.iter()))
    } else {
        None
    };

    Ok(PriceSummary {
        count: prices.len(),
        mean: Statistics::mean(prices.iter()),
        median: median(prices),
        std_dev,
        min: Statistics::min(prices.iter()),
        max: Statistics::max(prices.iter()),
    })
}

fn median(prices: &[f64]) -> f64 {
    let mut sorted: Vec<OrderedFloat<f64>> = prices.iter().copied().map(OrderedFloat).collect();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1].0 + sorted[mid].0) / 2.0
    } else {
        sorted[mid].0
    }
}
