//! Raw price records and their structural validation.
//!
//! Records arrive with a date that may be a calendar date or a string and a
//! close that may be absent. Validation turns them into typed observations
//! or fails with `InvalidInput`; it never inspects price values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use finsight_core::{Error, PriceObservation, Result, DATE_FORMAT};
use serde::{Deserialize, Serialize};

/// A record date as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// Already a calendar date.
    Date(NaiveDate),
    /// Textual date or timestamp.
    Text(String),
}

impl DateInput {
    /// Resolve to a calendar date.
    pub fn resolve(&self) -> Result<NaiveDate> {
        match self {
            DateInput::Date(d) => Ok(*d),
            DateInput::Text(s) => parse_date(s),
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

/// An unvalidated `{date, close}` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default)]
    pub date: Option<DateInput>,
    #[serde(default)]
    pub close: Option<f64>,
}

impl RawPriceRecord {
    /// A complete record.
    pub fn new(date: impl Into<DateInput>, close: f64) -> Self {
        Self {
            date: Some(date.into()),
            close: Some(close),
        }
    }

    /// Validate this record, `index` naming it in the error.
    pub fn validate(&self, index: usize) -> Result<PriceObservation> {
        let date = self
            .date
            .as_ref()
            .ok_or_else(|| missing_field(index, "date"))?
            .resolve()
            .map_err(|e| Error::invalid_input(format!("record {index}: {e}")))?;
        let close = self.close.ok_or_else(|| missing_field(index, "close"))?;
        Ok(PriceObservation::new(date, close))
    }
}

fn missing_field(index: usize, field: &str) -> Error {
    Error::invalid_input(format!("record {index} is missing required field '{field}'"))
}

/// Parse a date string.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// RFC 3339 timestamps; the time of day is discarded.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(Error::invalid_input(format!("unrecognized date '{s}'")))
}

/// Validate every record; the first malformed one aborts.
pub fn validate(records: &[RawPriceRecord]) -> Result<Vec<PriceObservation>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| r.validate(i))
        .collect()
}

/// Parse a JSON array of `{"date": ..., "close": ...}` objects.
///
/// Shape errors (not an array, non-numeric close) are reported as
/// `InvalidInput`; missing fields are left for [`validate`].
pub fn parse_json_records(json: &str) -> Result<Vec<RawPriceRecord>> {
    serde_json::from_str(json)
        .map_err(|e| Error::invalid_input(format!("malformed price records: {e}")))
}
