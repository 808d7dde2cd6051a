//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - wires the market data, sentiment and model collaborators
//! - runs the dashboard pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::anomaly::IsolationForest;
use crate::cli::{Command, DashboardArgs, ShowArgs, SourceKind};
use crate::data::{
    CsvSource, HttpSentimentClient, MarketDataSource, NoSentiment, SentimentSource, SyntheticSource, YahooClient,
};
use crate::domain::{AnomalyConfig, Column, DashboardConfig, ForecastConfig, WindowConfig};
use crate::error::AppError;
use crate::forecast::LinearAutoregressor;

pub mod pipeline;

use pipeline::{Collaborators, DashboardRun};

/// Entry point for the `cdash` binary.
pub fn run() -> Result<(), AppError> {
    // We want `cdash` and `cdash -s eth` to behave like `cdash tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The TUI owns the terminal; log lines would tear the screen.
    let default_level = match cli.command {
        Command::Tui(_) => "off",
        _ => "info",
    };
    init_tracing(default_level);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Tui(args) => handle_tui(args),
        Command::Show(args) => handle_show(args),
    }
}

/// `RUST_LOG` wins; otherwise log at `default_level` to stderr.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn handle_analyze(args: DashboardArgs) -> Result<(), AppError> {
    let config = dashboard_config_from_args(&args);
    config.validate()?;

    let market = build_market_source(&args)?;
    let sentiment = build_sentiment_source(&args);
    let mut outlier = IsolationForest::new(&config.anomaly, config.seed);
    let mut sequence = LinearAutoregressor::new();

    let today = chrono::Local::now().date_naive();
    let run = pipeline::run_dashboard(
        &config,
        today,
        Collaborators {
            market: market.as_ref(),
            sentiment: sentiment.as_ref(),
            outlier: &mut outlier,
            sequence: &mut sequence,
        },
    )?;

    print_run(&run, !args.no_plot, args.width, args.height);

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_table_csv(path, &run.table, run.labels.as_ref())?;
        tracing::info!(path = %path.display(), rows = run.table.len(), "wrote feature table");
    }
    if let Some(path) = &args.export_json {
        crate::io::write_run_json(path, &run)?;
        tracing::info!(path = %path.display(), "wrote run snapshot");
    }

    Ok(())
}

fn handle_tui(args: DashboardArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let run = crate::io::read_run_json(&args.run)?;
    print_run(&run, !args.no_plot, args.width, args.height);
    Ok(())
}

fn print_run(run: &DashboardRun, plot: bool, width: usize, height: usize) {
    println!("{}", crate::report::format_report(run));
    if !plot {
        return;
    }

    println!("{}", crate::plot::render_price_plot(run, width, height));
    println!("{}", crate::plot::LEGEND);
    println!();
    println!(
        "{}",
        crate::plot::render_line_plot(
            "Volatility",
            &run.table.column(Column::Volatility),
            None,
            width,
            height / 2
        )
    );
    println!(
        "{}",
        crate::plot::render_line_plot("RSI", &run.table.column(Column::Rsi), Some((0.0, 100.0)), width, height / 2)
    );
}

/// Pick the market data source for a set of dashboard flags.
pub fn build_market_source(args: &DashboardArgs) -> Result<Box<dyn MarketDataSource>, AppError> {
    match args.source_kind() {
        SourceKind::Yahoo => Ok(Box::new(YahooClient::from_env()?)),
        SourceKind::Csv => {
            let path = args
                .csv
                .as_ref()
                .ok_or_else(|| AppError::config("--source csv needs a --csv <path>"))?;
            Ok(Box::new(CsvSource::new(path)))
        }
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new(args.seed))),
    }
}

/// Sentiment is optional: a missing endpoint falls back to [`NoSentiment`].
pub fn build_sentiment_source(args: &DashboardArgs) -> Box<dyn SentimentSource> {
    if args.no_sentiment {
        return Box::new(NoSentiment);
    }
    match HttpSentimentClient::from_env() {
        Ok(client) => Box::new(client),
        Err(err) => {
            tracing::debug!(%err, "sentiment disabled");
            Box::new(NoSentiment)
        }
    }
}

pub fn dashboard_config_from_args(args: &DashboardArgs) -> DashboardConfig {
    DashboardConfig {
        symbol: args.symbol,
        horizon_days: args.days,
        end_date: args.end_date,
        windows: WindowConfig {
            short_window: args.short,
            long_window: args.long,
            volatility_window: args.vol_window,
            rsi_window: args.rsi_window,
        },
        forecast: ForecastConfig {
            window_len: args.forecast_window,
            horizon: args.forecast_horizon,
        },
        anomaly: AnomalyConfig {
            contamination: args.contamination,
            n_trees: args.trees,
            ..AnomalyConfig::default()
        },
        seed: args.seed,
    }
}

/// Rewrite argv so `cdash` defaults to `cdash tui`.
///
/// Rules:
/// - `cdash`                      -> `cdash tui`
/// - `cdash -s eth ...`           -> `cdash tui -s eth ...`
/// - `cdash --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "analyze" | "tui" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["cdash"])), argv(&["cdash", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["cdash", "-s", "eth"])),
            argv(&["cdash", "tui", "-s", "eth"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [&["cdash", "analyze", "-d", "30"][..], &["cdash", "--help"], &["cdash", "show", "x.json"]] {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn config_mirrors_flags() {
        let cli = crate::cli::Cli::try_parse_from([
            "cdash",
            "analyze",
            "-s",
            "ada",
            "-d",
            "120",
            "--short",
            "10",
            "--long",
            "30",
            "--vol-window",
            "7",
            "--forecast-horizon",
            "3",
            "--contamination",
            "0.1",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = dashboard_config_from_args(&args);
        config.validate().unwrap();
        assert_eq!(config.symbol, crate::domain::Symbol::Ada);
        assert_eq!(config.horizon_days, 120);
        assert_eq!(config.windows.short_window, 10);
        assert_eq!(config.windows.long_window, 30);
        assert_eq!(config.windows.volatility_window, 7);
        assert_eq!(config.forecast.horizon, 3);
        assert_eq!(config.anomaly.contamination, 0.1);
        assert_eq!(config.anomaly.max_samples, AnomalyConfig::default().max_samples);
    }

    #[test]
    fn csv_source_without_path_is_a_configuration_error() {
        let cli = crate::cli::Cli::try_parse_from(["cdash", "analyze", "--source", "csv"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let err = build_market_source(&args).err().unwrap();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn synthetic_source_needs_no_network() {
        let cli = crate::cli::Cli::try_parse_from(["cdash", "analyze", "--source", "synthetic"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let source = build_market_source(&args).unwrap();
        assert_eq!(source.name(), "synthetic");
    }
}
