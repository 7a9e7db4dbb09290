//! SQLite-backed price and metric storage.

use crate::schema::{CREATE_SCHEMA, METRIC_COLUMNS, UPSERT_METRIC, UPSERT_PRICE};
use chrono::NaiveDate;
use finsight_core::config::StoreConfig;
use finsight_core::{
    normalize_ticker, DailyBar, Error, MetricRow, PriceObservation, Result, TickerMetricRow,
    DATE_FORMAT,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;

/// Row counts and date ranges across both tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub total_tickers: usize,
    pub price_rows: usize,
    pub metrics_rows: usize,
    pub earliest_price_date: Option<NaiveDate>,
    pub latest_price_date: Option<NaiveDate>,
    pub earliest_metric_date: Option<NaiveDate>,
    pub latest_metric_date: Option<NaiveDate>,
}

/// Price and metric store keyed by `(ticker, date)`.
pub struct MetricStore {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date_text(text: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    parse_date_text(&text, idx)
}

fn opt_date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_date_text(&t, idx)).transpose()
}

/// Map `METRIC_COLUMNS` starting at `offset`.
fn metric_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<MetricRow> {
    Ok(MetricRow {
        date: date_col(row, offset)?,
        ret: row.get(offset + 1)?,
        vol20: row.get(offset + 2)?,
        vol60: row.get(offset + 3)?,
        sma20: row.get(offset + 4)?,
        sma50: row.get(offset + 5)?,
        sharpe20: row.get(offset + 6)?,
        sharpe60: row.get(offset + 7)?,
    })
}

impl MetricStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open the database named by the configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        if config.database_url == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(&config.database_url)
        }
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Create tables if missing.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_SCHEMA).map_err(db_err)
    }

    /// Insert or overwrite price bars. Returns rows written.
    pub fn upsert_prices(&mut self, ticker: &str, bars: &[DailyBar]) -> Result<usize> {
        let ticker = normalize_ticker(ticker);
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_PRICE).map_err(db_err)?;
            for bar in bars {
                stmt.execute(params![
                    ticker,
                    fmt_date(bar.date),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        tracing::debug!(ticker = %ticker, rows = bars.len(), "upserted prices");
        Ok(bars.len())
    }

    /// Insert or overwrite metric rows. Returns rows written.
    ///
    /// Rows with a non-finite field are refused as `InvalidInput`; nothing is
    /// written in that case.
    pub fn upsert_metrics(&mut self, ticker: &str, rows: &[MetricRow]) -> Result<usize> {
        if let Some(bad) = rows.iter().find(|r| !r.is_finite()) {
            return Err(Error::invalid_input(format!(
                "metric row {} has non-finite values",
                bad.date
            )));
        }

        let ticker = normalize_ticker(ticker);
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_METRIC).map_err(db_err)?;
            for row in rows {
                stmt.execute(params![
                    ticker,
                    fmt_date(row.date),
                    row.ret,
                    row.vol20,
                    row.vol60,
                    row.sma20,
                    row.sma50,
                    row.sharpe20,
                    row.sharpe60,
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        tracing::debug!(ticker = %ticker, rows = rows.len(), "upserted metrics");
        Ok(rows.len())
    }

    /// Tickers present in either table, sorted.
    pub fn tracked_tickers(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticker FROM prices UNION SELECT ticker FROM metrics ORDER BY 1")
            .map_err(db_err)?;
        let tickers = stmt
            .query_map([], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(tickers)
    }

    /// Stored bars for a ticker, ascending by date.
    pub fn prices_for(&self, ticker: &str) -> Result<Vec<DailyBar>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, open, high, low, close, volume FROM prices \
                 WHERE ticker = ?1 ORDER BY date",
            )
            .map_err(db_err)?;
        let bars = stmt
            .query_map(params![normalize_ticker(ticker)], |row| {
                Ok(DailyBar {
                    date: date_col(row, 0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(bars)
    }

    /// Stored closes for a ticker as engine input.
    pub fn observations_for(&self, ticker: &str) -> Result<Vec<PriceObservation>> {
        Ok(self
            .prices_for(ticker)?
            .iter()
            .map(DailyBar::observation)
            .collect())
    }

    /// Most recent stored close and its date.
    pub fn latest_close(&self, ticker: &str) -> Result<Option<PriceObservation>> {
        self.conn
            .query_row(
                "SELECT date, close FROM prices WHERE ticker = ?1 ORDER BY date DESC LIMIT 1",
                params![normalize_ticker(ticker)],
                |row| Ok(PriceObservation::new(date_col(row, 0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)
    }

    /// All metric rows for a ticker, ascending by date.
    pub fn metrics_for(&self, ticker: &str) -> Result<Vec<MetricRow>> {
        let sql = format!("SELECT {METRIC_COLUMNS} FROM metrics WHERE ticker = ?1 ORDER BY date");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![normalize_ticker(ticker)], |row| metric_row(row, 0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Latest metric row for one ticker.
    pub fn latest_metric_for(&self, ticker: &str) -> Result<Option<MetricRow>> {
        let sql = format!(
            "SELECT {METRIC_COLUMNS} FROM metrics WHERE ticker = ?1 ORDER BY date DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![normalize_ticker(ticker)], |row| {
                metric_row(row, 0)
            })
            .optional()
            .map_err(db_err)
    }

    /// Latest metric row of every ticker, ordered by ticker.
    pub fn latest_metrics(&self) -> Result<Vec<TickerMetricRow>> {
        let sql = format!(
            "SELECT ticker, {METRIC_COLUMNS} FROM metrics AS m \
             WHERE date = (SELECT MAX(date) FROM metrics WHERE ticker = m.ticker) \
             ORDER BY ticker"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TickerMetricRow {
                    ticker: row.get(0)?,
                    row: metric_row(row, 1)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Counts and date ranges.
    pub fn summary(&self) -> Result<StoreSummary> {
        self.conn
            .query_row(
                "SELECT \
                   (SELECT COUNT(*) FROM (SELECT ticker FROM prices UNION SELECT ticker FROM metrics)), \
                   (SELECT COUNT(*) FROM prices), \
                   (SELECT COUNT(*) FROM metrics), \
                   (SELECT MIN(date) FROM prices), \
                   (SELECT MAX(date) FROM prices), \
                   (SELECT MIN(date) FROM metrics), \
                   (SELECT MAX(date) FROM metrics)",
                [],
                |row| {
                    Ok(StoreSummary {
                        total_tickers: row.get::<_, i64>(0)? as usize,
                        price_rows: row.get::<_, i64>(1)? as usize,
                        metrics_rows: row.get::<_, i64>(2)? as usize,
                        earliest_price_date: opt_date_col(row, 3)?,
                        latest_price_date: opt_date_col(row, 4)?,
                        earliest_metric_date: opt_date_col(row, 5)?,
                        latest_metric_date: opt_date_col(row, 6)?,
                    })
                },
            )
            .map_err(db_err)
    }
}
