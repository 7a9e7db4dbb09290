//! Configuration structures for the finsight system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable overriding [`StoreConfig::database_url`].
pub const DATABASE_URL_ENV: &str = "FINSIGHT_DATABASE_URL";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metric engine configuration.
    pub metrics: MetricsConfig,
    /// Persistence configuration.
    pub store: StoreConfig,
}

impl Config {
    /// Parse a configuration from a JSON document. Missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply environment overrides.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.store.database_url = url;
            }
        }
        self
    }
}

/// How repeated dates in one input are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The last occurrence in input order wins.
    #[default]
    KeepLast,
    /// Any repeated date is an `InvalidInput` error.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep_last" => Ok(DuplicatePolicy::KeepLast),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(Error::config(format!(
                "unknown duplicate_policy '{other}', expected 'keep_last' or 'reject'"
            ))),
        }
    }
}

/// What a sharpe cell becomes when its window has zero volatility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVolatilityPolicy {
    /// The cell is missing and the row is dropped.
    #[default]
    Exclude,
    /// The cell is reported as `0.0`.
    ZeroSentinel,
}

impl FromStr for ZeroVolatilityPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exclude" => Ok(ZeroVolatilityPolicy::Exclude),
            "zero_sentinel" => Ok(ZeroVolatilityPolicy::ZeroSentinel),
            other => Err(Error::config(format!(
                "unknown zero_volatility '{other}', expected 'exclude' or 'zero_sentinel'"
            ))),
        }
    }
}

/// Metric engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Duplicate date handling.
    pub duplicate_policy: DuplicatePolicy,
    /// Sharpe handling for flat windows.
    pub zero_volatility: ZeroVolatilityPolicy,
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path (or `:memory:`).
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "finsight.db".to_string(),
        }
    }
}
