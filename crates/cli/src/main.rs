//! finsight CLI: import prices, refresh metrics, inspect results.
//!
//! Commands:
//! - `import`: load a CSV price file for a ticker, store prices and metrics
//! - `refresh`: recompute metrics for every tracked ticker from stored prices
//! - `metrics`: one-line summary for a ticker
//! - `latest`: latest metric row of every ticker
//! - `tickers` / `summary`: database contents

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finsight_core::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finsight", about = "finsight, rolling price metrics per ticker")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path; overrides the configuration.
    #[arg(long, global = true)]
    database: Option<String>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load prices from CSV for a ticker, then compute and store its metrics.
    Import {
        /// Ticker symbol (e.g., AAPL).
        #[arg(short, long)]
        ticker: String,

        /// CSV file with at least `date` and `close` columns.
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recompute metrics for all tracked tickers from stored prices.
    Refresh,
    /// Show a one-line metrics summary for a ticker.
    Metrics {
        /// Ticker symbol (e.g., AAPL).
        #[arg(short, long)]
        ticker: String,
    },
    /// Show the latest metric row of every ticker.
    Latest,
    /// List tracked tickers.
    Tickers,
    /// Show database counts and date ranges.
    Summary,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    }
    .apply_env();

    if let Some(db) = &cli.database {
        config.store.database_url = db.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;
    let mut app = commands::App::open(&config)?;

    match cli.command {
        Commands::Import { ticker, csv } => commands::run_import(&mut app, &ticker, &csv),
        Commands::Refresh => commands::run_refresh(&mut app),
        Commands::Metrics { ticker } => commands::run_metrics(&app, &ticker),
        Commands::Latest => commands::run_latest(&app),
        Commands::Tickers => commands::run_tickers(&app),
        Commands::Summary => commands::run_summary(&app),
    }
}
