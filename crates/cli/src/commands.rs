//! Command implementations.

use anyhow::{bail, Context, Result};
use finsight_core::{normalize_ticker, Config, MetricRow, PriceObservation};
use finsight_features::MetricEngine;
use finsight_ingestion::read_csv;
use finsight_store::{refresh_all, refresh_ticker, MetricStore, StoreSummary};
use std::fs::File;
use std::path::Path;

/// Engine and store opened from configuration.
pub struct App {
    pub engine: MetricEngine,
    pub store: MetricStore,
}

impl App {
    pub fn open(config: &Config) -> Result<Self> {
        let store = MetricStore::from_config(&config.store)
            .with_context(|| format!("opening database {}", config.store.database_url))?;
        tracing::debug!(database = %config.store.database_url, "opened store");
        Ok(Self {
            engine: MetricEngine::new(&config.metrics),
            store,
        })
    }
}

pub fn run_import(app: &mut App, ticker: &str, csv: &Path) -> Result<()> {
    let file = File::open(csv).with_context(|| format!("opening {}", csv.display()))?;
    let bars = read_csv(file).with_context(|| format!("reading {}", csv.display()))?;
    let outcome = refresh_ticker(&mut app.store, &app.engine, ticker, &bars)?;

    println!(
        "Imported {}: {} prices, {} metric rows",
        outcome.ticker, outcome.prices_written, outcome.metrics_written
    );
    Ok(())
}

pub fn run_refresh(app: &mut App) -> Result<()> {
    let report = refresh_all(&mut app.store, &app.engine)?;
    if report.processed == 0 && report.all_succeeded() {
        println!("No tickers tracked in database. Nothing to refresh.");
        return Ok(());
    }

    println!("Refresh complete.");
    println!(
        "Processed: {}, Errors: {}",
        report.processed,
        report.errors.len()
    );
    for err in &report.errors {
        println!(" - {}: {}", err.ticker, err.error);
    }
    println!();
    print_summary(&app.store.summary()?);
    Ok(())
}

pub fn run_metrics(app: &App, ticker: &str) -> Result<()> {
    let ticker = normalize_ticker(ticker);
    let Some(row) = app.store.latest_metric_for(&ticker)? else {
        bail!("no metrics found for {ticker}");
    };
    let close = app.store.latest_close(&ticker)?;
    println!("{}", format_metric_line(&ticker, close.as_ref(), &row));
    Ok(())
}

pub fn run_latest(app: &App) -> Result<()> {
    let rows = app.store.latest_metrics()?;
    if rows.is_empty() {
        println!("No metrics stored.");
        return Ok(());
    }
    println!(
        "{:<8} {:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "ticker", "date", "return", "vol20", "vol60", "sma20", "sma50", "sharpe20", "sharpe60"
    );
    for tagged in rows {
        let r = &tagged.row;
        println!(
            "{:<8} {:<10} {:>10.6} {:>10.6} {:>10.6} {:>10.4} {:>10.4} {:>10.6} {:>10.6}",
            tagged.ticker,
            r.date,
            r.ret,
            r.vol20,
            r.vol60,
            r.sma20,
            r.sma50,
            r.sharpe20,
            r.sharpe60
        );
    }
    Ok(())
}

pub fn run_tickers(app: &App) -> Result<()> {
    for ticker in app.store.tracked_tickers()? {
        println!("{ticker}");
    }
    Ok(())
}

pub fn run_summary(app: &App) -> Result<()> {
    print_summary(&app.store.summary()?);
    Ok(())
}

fn print_summary(summary: &StoreSummary) {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    println!("DB Summary:");
    println!("  total_tickers: {}", summary.total_tickers);
    println!("  price_rows: {}", summary.price_rows);
    println!("  metrics_rows: {}", summary.metrics_rows);
    println!("  earliest_price_date: {}", date(summary.earliest_price_date));
    println!("  latest_price_date: {}", date(summary.latest_price_date));
    println!("  earliest_metric_date: {}", date(summary.earliest_metric_date));
    println!("  latest_metric_date: {}", date(summary.latest_metric_date));
}

/// `TICKER | close: X (as of D) | return: Y | sharpe20: Z`
pub fn format_metric_line(ticker: &str, close: Option<&PriceObservation>, row: &MetricRow) -> String {
    let close_part = match close {
        Some(obs) => format!("{:.4} (as of {})", obs.close, obs.date),
        None => "n/a".to_string(),
    };
    format!(
        "{ticker} | close: {close_part} | return: {:.6} | sharpe20: {:.6}",
        row.ret, row.sharpe20
    )
}
