//! CSV price file reading.
//!
//! The header must name `date` and `close` columns (case-insensitive);
//! `open`, `high`, `low` and `volume` are picked up when present.

use crate::record::parse_date;
use finsight_core::{DailyBar, Error, Result};
use std::io::Read;

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name)
                .ok_or_else(|| Error::invalid_input(format!("input must contain column '{name}'")))
        };

        Ok(Self {
            date: required("date")?,
            close: required("close")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            volume: find("volume"),
        })
    }
}

/// Read daily bars from CSV.
///
/// An empty `date` or `close` cell is a missing field and fails the whole
/// read with `InvalidInput`. Row numbers in errors are 1-based data rows.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<DailyBar>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| Error::csv(e.to_string()))?.clone();
    let cols = Columns::resolve(&headers)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| Error::csv(e.to_string()))?;
        let row = i + 1;

        let date_cell = cell(&record, Some(cols.date))
            .ok_or_else(|| Error::invalid_input(format!("row {row} is missing 'date'")))?;
        let date = parse_date(date_cell)
            .map_err(|e| Error::invalid_input(format!("row {row}: {e}")))?;
        let close = number(&record, Some(cols.close), row, "close")?
            .ok_or_else(|| Error::invalid_input(format!("row {row} is missing 'close'")))?;

        bars.push(DailyBar {
            date,
            open: number(&record, cols.open, row, "open")?,
            high: number(&record, cols.high, row, "high")?,
            low: number(&record, cols.low, row, "low")?,
            close,
            volume: number(&record, cols.volume, row, "volume")?,
        });
    }

    tracing::debug!(rows = bars.len(), "read price csv");
    Ok(bars)
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty())
}

fn number(
    record: &csv::StringRecord,
    idx: Option<usize>,
    row: usize,
    name: &str,
) -> Result<Option<f64>> {
    cell(record, idx)
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| Error::invalid_input(format!("row {row}: '{name}' is not a number: {s}")))
        })
        .transpose()
}
