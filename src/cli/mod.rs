//! Command-line parsing for the crypto analysis dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the indicator/model code. Slider bounds live in
//! `domain::config` and are enforced here with clap range parsers, so an
//! out-of-range flag never reaches the pipeline.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::{
    DEFAULT_RSI_WINDOW, HORIZON_DAYS, LONG_WINDOW, SHORT_WINDOW, Symbol, VOLATILITY_WINDOW,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cdash", version, about = "Cryptocurrency Analysis Dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once and print statistics, anomalies, forecast and charts.
    Analyze(DashboardArgs),
    /// Launch the interactive dashboard (default).
    ///
    /// This uses the same underlying pipeline as `cdash analyze`, but renders
    /// results in a terminal UI using Ratatui.
    Tui(DashboardArgs),
    /// Re-render a run saved with `cdash analyze --export-json`.
    Show(ShowArgs),
}

/// Where daily bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Yahoo Finance chart API (network).
    Yahoo,
    /// A local CSV file (`--csv`).
    Csv,
    /// Seeded synthetic prices (offline demo).
    Synthetic,
}

/// Dashboard settings shared by `analyze` and `tui`.
#[derive(Debug, Parser, Clone)]
pub struct DashboardArgs {
    /// Cryptocurrency to analyze (BTC, ETH, XRP, LTC, ADA).
    #[arg(short = 's', long, value_enum, default_value_t = Symbol::Btc)]
    pub symbol: Symbol,

    /// Days of history to analyze.
    #[arg(
        short = 'd',
        long,
        default_value_t = HORIZON_DAYS.2,
        value_parser = clap::value_parser!(u32).range(i64::from(HORIZON_DAYS.0)..=i64::from(HORIZON_DAYS.1))
    )]
    pub days: u32,

    /// Last day of the range (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Short moving-average window (days).
    #[arg(
        long,
        default_value_t = SHORT_WINDOW.2,
        value_parser = RangedU64ValueParser::<usize>::new().range(SHORT_WINDOW.0 as u64..=SHORT_WINDOW.1 as u64)
    )]
    pub short: usize,

    /// Long moving-average window (days).
    #[arg(
        long,
        default_value_t = LONG_WINDOW.2,
        value_parser = RangedU64ValueParser::<usize>::new().range(LONG_WINDOW.0 as u64..=LONG_WINDOW.1 as u64)
    )]
    pub long: usize,

    /// Rolling volatility window (days).
    #[arg(
        long = "vol-window",
        default_value_t = VOLATILITY_WINDOW.2,
        value_parser = RangedU64ValueParser::<usize>::new().range(VOLATILITY_WINDOW.0 as u64..=VOLATILITY_WINDOW.1 as u64)
    )]
    pub vol_window: usize,

    /// RSI lookback window (days).
    #[arg(
        long = "rsi-window",
        default_value_t = DEFAULT_RSI_WINDOW,
        value_parser = RangedU64ValueParser::<usize>::new().range(2..=100)
    )]
    pub rsi_window: usize,

    /// Number of past closes fed to the forecast model.
    #[arg(
        long = "forecast-window",
        default_value_t = 30,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=180)
    )]
    pub forecast_window: usize,

    /// Days to forecast past the last close.
    #[arg(
        long = "forecast-horizon",
        default_value_t = 7,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=60)
    )]
    pub forecast_horizon: usize,

    /// Expected share of anomalous days, in (0, 0.5].
    #[arg(long, default_value_t = 0.05, value_parser = parse_contamination)]
    pub contamination: f64,

    /// Isolation forest size.
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Random seed for the anomaly model and synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Market data source.
    #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
    pub source: SourceKind,

    /// CSV file with `date,open,high,low,close,volume` (implies `--source csv`).
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Skip the sentiment lookup.
    #[arg(long)]
    pub no_sentiment: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the feature table (with anomaly labels) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the full run to JSON (re-render with `cdash show`).
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

impl DashboardArgs {
    /// The effective source: a `--csv` path always wins.
    pub fn source_kind(&self) -> SourceKind {
        if self.csv.is_some() { SourceKind::Csv } else { self.source }
    }
}

/// Options for re-rendering a saved run.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Run JSON file produced by `cdash analyze --export-json`.
    #[arg(value_name = "JSON")]
    pub run: PathBuf,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

fn parse_contamination(raw: &str) -> Result<f64, String> {
    let v: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if v > 0.0 && v <= 0.5 {
        Ok(v)
    } else {
        Err(format!("{v} is not in (0, 0.5]"))
    }
}
