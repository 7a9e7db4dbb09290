//! SQLite schema.
//!
//! Both tables are keyed by `(ticker, date)`; dates are ISO `YYYY-MM-DD`
//! text so lexical order is chronological order.

/// Table and index creation, idempotent.
pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prices (
    ticker  TEXT NOT NULL,
    date    TEXT NOT NULL,
    open    REAL,
    high    REAL,
    low     REAL,
    close   REAL NOT NULL,
    volume  REAL,
    PRIMARY KEY (ticker, date)
);

CREATE TABLE IF NOT EXISTS metrics (
    ticker    TEXT NOT NULL,
    date      TEXT NOT NULL,
    "return"  REAL NOT NULL,
    vol20     REAL NOT NULL,
    vol60     REAL NOT NULL,
    sma20     REAL NOT NULL,
    sma50     REAL NOT NULL,
    sharpe20  REAL NOT NULL,
    sharpe60  REAL NOT NULL,
    PRIMARY KEY (ticker, date)
);

CREATE INDEX IF NOT EXISTS idx_metrics_date ON metrics (date);
"#;

pub const UPSERT_PRICE: &str = r#"
INSERT INTO prices (ticker, date, open, high, low, close, volume)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (ticker, date) DO UPDATE SET
    open = excluded.open,
    high = excluded.high,
    low = excluded.low,
    close = excluded.close,
    volume = excluded.volume
"#;

pub const UPSERT_METRIC: &str = r#"
INSERT INTO metrics (ticker, date, "return", vol20, vol60, sma20, sma50, sharpe20, sharpe60)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT (ticker, date) DO UPDATE SET
    "return" = excluded."return",
    vol20 = excluded.vol20,
    vol60 = excluded.vol60,
    sma20 = excluded.sma20,
    sma50 = excluded.sma50,
    sharpe20 = excluded.sharpe20,
    sharpe60 = excluded.sharpe60
"#;

/// Columns selected for a metric row, in `MetricRow` field order after `date`.
pub const METRIC_COLUMNS: &str =
    r#"date, "return", vol20, vol60, sma20, sma50, sharpe20, sharpe60"#;
