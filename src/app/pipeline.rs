//! Shared dashboard pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch -> gap fill -> indicators -> feature table -> {anomalies, forecast, sentiment} -> summary
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyLabels, AnomalyScorer, OutlierModel};
use crate::data::{MarketDataSource, SentimentSource};
use crate::domain::{DashboardConfig, FeatureTable, Series};
use crate::error::AppError;
use crate::features::{assemble, gaps};
use crate::forecast::{Forecast, ForecastPreparer, SequenceModel};
use crate::indicators::IndicatorEngine;
use crate::report::{DashboardSummary, summarize_table};

/// Dashboard section a warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Data,
    Indicators,
    Anomalies,
    Forecast,
    Sentiment,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::Data => "Data",
            Section::Indicators => "Indicators",
            Section::Anomalies => "Anomalies",
            Section::Forecast => "Forecast",
            Section::Sentiment => "Sentiment",
        }
    }
}

/// A non-fatal problem shown next to the affected section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionWarning {
    pub section: Section,
    pub message: String,
}

impl SectionWarning {
    fn new(section: Section, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }
}

/// All computed outputs of a single dashboard render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRun {
    pub config: DashboardConfig,
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub table: FeatureTable,
    pub labels: Option<AnomalyLabels>,
    pub forecast: Option<Forecast>,
    pub sentiment: Option<f64>,
    pub summary: DashboardSummary,
    pub warnings: Vec<SectionWarning>,
}

impl DashboardRun {
    pub fn warnings_for(&self, section: Section) -> impl Iterator<Item = &SectionWarning> {
        self.warnings.iter().filter(move |w| w.section == section)
    }
}

/// The swappable collaborators of one run.
pub struct Collaborators<'a> {
    pub market: &'a dyn MarketDataSource,
    pub sentiment: &'a dyn SentimentSource,
    pub outlier: &'a mut dyn OutlierModel,
    pub sequence: &'a mut dyn SequenceModel,
}

/// Execute the full pipeline: validate, fetch, compute.
///
/// Configuration errors are raised before the market data source is touched.
pub fn run_dashboard(
    config: &DashboardConfig,
    today: NaiveDate,
    collab: Collaborators<'_>,
) -> Result<DashboardRun, AppError> {
    config.validate()?;

    let (start, end) = config.date_range(today);
    let series = collab.market.fetch(config.symbol, start, end)?;
    if series.is_empty() {
        return Err(AppError::unavailable(format!(
            "{} returned no bars for {} between {start} and {end}",
            collab.market.name(),
            config.symbol
        )));
    }
    tracing::info!(
        symbol = %config.symbol,
        source = collab.market.name(),
        bars = series.len(),
        %start,
        %end,
        "fetched market data"
    );

    let source = collab.market.name().to_string();
    run_dashboard_on_series(
        config,
        series,
        (start, end),
        &source,
        collab.sentiment,
        collab.outlier,
        collab.sequence,
    )
}

/// Execute the pipeline on an already-fetched series.
///
/// This is useful for the TUI where we want to recompute indicators without
/// re-fetching when only a window setting changed.
pub fn run_dashboard_on_series(
    config: &DashboardConfig,
    series: Series,
    (start, end): (NaiveDate, NaiveDate),
    source: &str,
    sentiment: &dyn SentimentSource,
    outlier: &mut dyn OutlierModel,
    sequence: &mut dyn SequenceModel,
) -> Result<DashboardRun, AppError> {
    config.validate()?;
    if series.symbol() != config.symbol {
        return Err(AppError::config(format!(
            "series is for {} but the dashboard is configured for {}",
            series.symbol(),
            config.symbol
        )));
    }

    let mut warnings = Vec::new();

    // 1) Repair price gaps, then derive indicators from the repaired closes.
    let engine = IndicatorEngine::new(config.windows)?;
    let filled = gaps::fill_prices(&series);
    let leading = filled.closes().iter().take_while(|c| c.is_none()).count();
    if leading > 0 {
        warnings.push(SectionWarning::new(
            Section::Data,
            format!("{leading} leading day(s) have no close price"),
        ));
    }
    if filled.volumes().iter().all(Option::is_none) {
        warnings.push(SectionWarning::new(Section::Data, "volume is missing for every day"));
    }

    let indicators = engine.compute(&filled)?;
    if !indicators.zero_division.is_empty() {
        warnings.push(SectionWarning::new(
            Section::Indicators,
            format!(
                "daily return undefined on {} day(s) after a zero close (first: {})",
                indicators.zero_division.len(),
                indicators.zero_division[0]
            ),
        ));
    }
    if filled.len() < config.windows.long_window {
        warnings.push(SectionWarning::new(
            Section::Indicators,
            format!(
                "{} days of data is shorter than the {}-day long moving average",
                filled.len(),
                config.windows.long_window
            ),
        ));
    }

    // 2) Feature table. Summary statistics see the warm-up nulls; the models
    // see the zero-filled derived columns.
    let mut table = assemble(&filled, &indicators, config.windows)?;
    let summary = summarize_table(&table);
    let zero_filled = gaps::fill_derived(&mut table);
    tracing::debug!(rows = table.len(), zero_filled, "assembled feature table");

    // 3) Optional sections degrade to warnings.
    let labels = soft(
        Section::Anomalies,
        AnomalyScorer::new(outlier).label(&table),
        &mut warnings,
    )?;

    let preparer = ForecastPreparer::new(config.forecast)?;
    let forecast = soft(Section::Forecast, preparer.run_table(sequence, &table), &mut warnings)?;

    let sentiment = soft(
        Section::Sentiment,
        sentiment.fetch_sentiment(config.symbol),
        &mut warnings,
    )?;

    for w in &warnings {
        tracing::warn!(section = w.section.title(), "{}", w.message);
    }
    tracing::info!(
        symbol = %config.symbol,
        rows = table.len(),
        anomalies = labels.as_ref().map(AnomalyLabels::anomalous_count),
        forecast = forecast.as_ref().map(|f| f.predictions.len()),
        warnings = warnings.len(),
        "dashboard run complete"
    );

    Ok(DashboardRun {
        config: config.clone(),
        source: source.to_string(),
        start,
        end,
        table,
        labels,
        forecast,
        sentiment,
        summary,
        warnings,
    })
}

/// Turn a non-fatal section error into a warning; propagate fatal ones.
fn soft<T>(section: Section, result: Result<T, AppError>, warnings: &mut Vec<SectionWarning>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warnings.push(SectionWarning::new(section, err.to_string()));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Duration;

    use super::*;
    use crate::anomaly::IsolationForest;
    use crate::domain::{Bar, Symbol, WindowConfig};
    use crate::forecast::LinearAutoregressor;

    struct FixedSource {
        closes: Vec<Option<f64>>,
        calls: Cell<usize>,
    }

    impl FixedSource {
        fn new(closes: Vec<Option<f64>>) -> Self {
            Self {
                closes,
                calls: Cell::new(0),
            }
        }
    }

    impl MarketDataSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, symbol: Symbol, start: NaiveDate, _end: NaiveDate) -> Result<Series, AppError> {
            self.calls.set(self.calls.get() + 1);
            let bars = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar {
                    volume: c.map(|v| v * 10.0),
                    ..Bar::from_close(start + Duration::days(i as i64), c)
                })
                .collect();
            Series::new(symbol, bars)
        }
    }

    struct FixedSentiment(Result<f64, AppError>);

    impl SentimentSource for FixedSentiment {
        fn fetch_sentiment(&self, _: Symbol) -> Result<f64, AppError> {
            self.0.clone()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn wave(n: usize) -> Vec<Option<f64>> {
        (0..n).map(|i| Some(100.0 + 10.0 * (i as f64 / 5.0).sin() + i as f64 * 0.2)).collect()
    }

    fn run(
        config: &DashboardConfig,
        market: &dyn MarketDataSource,
        sentiment: &dyn SentimentSource,
    ) -> Result<DashboardRun, AppError> {
        let mut outlier = IsolationForest::new(&config.anomaly, config.seed);
        let mut sequence = LinearAutoregressor::new();
        run_dashboard(
            config,
            today(),
            Collaborators {
                market,
                sentiment,
                outlier: &mut outlier,
                sequence: &mut sequence,
            },
        )
    }

    #[test]
    fn inverted_windows_are_rejected_before_fetch() {
        let config = DashboardConfig {
            windows: WindowConfig {
                short_window: 50,
                long_window: 20,
                ..WindowConfig::default()
            },
            ..DashboardConfig::default()
        };
        let source = FixedSource::new(wave(90));
        let err = run(&config, &source, &FixedSentiment(Ok(0.0))).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn empty_fetch_is_unavailable() {
        let source = FixedSource::new(Vec::new());
        let err = run(&DashboardConfig::default(), &source, &FixedSentiment(Ok(0.0))).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn full_run_fills_every_section() {
        let config = DashboardConfig::default();
        let source = FixedSource::new(wave(91));
        let out = run(&config, &source, &FixedSentiment(Ok(0.3))).unwrap();

        assert_eq!(out.table.len(), 91);
        assert_eq!(out.sentiment, Some(0.3));
        assert_eq!(out.forecast.as_ref().map(|f| f.predictions.len()), Some(config.forecast.horizon));
        let labels = out.labels.as_ref().unwrap();
        assert_eq!(labels.labels.len(), 91);
        assert!(labels.anomalous_count() >= 1);
        assert!(out.summary.close.is_some());
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);

        // Derived columns are zero-filled; SMA warm-up stays null.
        let first = &out.table.rows[0].indicators;
        assert_eq!(first.daily_return, Some(0.0));
        assert_eq!(first.volatility, Some(0.0));
        assert_eq!(first.sma_short, None);
    }

    #[test]
    fn summary_skips_zero_filled_warm_up() {
        use crate::domain::Column;
        use crate::math::pearson_pairwise;

        let config = DashboardConfig::default();
        let source = FixedSource::new(wave(91));
        let out = run(&config, &source, &FixedSentiment(Ok(0.0))).unwrap();

        // Day 0 has no return; it must not be binned as 0.0.
        let hist = out.summary.returns_histogram.as_ref().unwrap();
        assert_eq!(hist.total(), 90);

        // Volatility is zero-filled on the first `volatility_window` rows of the
        // table, but the correlation only sees the defined values.
        let w = config.windows.volatility_window;
        assert!(out.table.rows[..w].iter().all(|r| r.indicators.volatility == Some(0.0)));
        let close = out.table.column(Column::Close);
        let vol = out.table.column(Column::Volatility);
        let expected = pearson_pairwise(&close[w..], &vol[w..]).unwrap();
        let reported = out.summary.correlation.get(Column::Close, Column::Volatility).unwrap();
        assert!((reported - expected).abs() < 1e-12, "{reported} vs {expected}");
    }

    #[test]
    fn sentiment_failure_is_a_section_warning() {
        let source = FixedSource::new(wave(91));
        let sentiment = FixedSentiment(Err(AppError::external("sentiment", "timeout")));
        let out = run(&DashboardConfig::default(), &source, &sentiment).unwrap();
        assert_eq!(out.sentiment, None);
        assert_eq!(out.warnings_for(Section::Sentiment).count(), 1);
        assert!(out.forecast.is_some());
    }

    #[test]
    fn short_history_degrades_forecast_only() {
        let config = DashboardConfig::default();
        let source = FixedSource::new(wave(20));
        let out = run(&config, &source, &FixedSentiment(Ok(0.0))).unwrap();
        assert!(out.forecast.is_none());
        assert_eq!(out.warnings_for(Section::Forecast).count(), 1);
        assert_eq!(out.warnings_for(Section::Indicators).count(), 1);
        assert!(out.labels.is_some());
    }

    #[test]
    fn negative_price_is_a_configuration_error() {
        let mut closes = wave(60);
        closes[10] = Some(-1.0);
        let source = FixedSource::new(closes);
        let err = run(&DashboardConfig::default(), &source, &FixedSentiment(Ok(0.0))).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn zero_close_is_reported_not_fatal() {
        let mut closes = wave(60);
        closes[10] = Some(0.0);
        let source = FixedSource::new(closes);
        let out = run(&DashboardConfig::default(), &source, &FixedSentiment(Ok(0.0))).unwrap();
        assert_eq!(out.warnings_for(Section::Indicators).count(), 1);
        assert_eq!(out.table.rows[11].indicators.daily_return, Some(0.0));
    }

    #[test]
    fn leading_gap_is_reported() {
        let mut closes = wave(60);
        closes[0] = None;
        closes[1] = None;
        let source = FixedSource::new(closes);
        let out = run(&DashboardConfig::default(), &source, &FixedSentiment(Ok(0.0))).unwrap();
        assert_eq!(out.warnings_for(Section::Data).count(), 1);
        let labels = out.labels.unwrap();
        assert_eq!(labels.labels[0], None);
        assert!(labels.labels[2].is_some());
    }

    #[test]
    fn run_survives_json_round_trip() {
        let source = FixedSource::new(wave(91));
        let out = run(&DashboardConfig::default(), &source, &FixedSentiment(Ok(0.1))).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        let back: DashboardRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back.table.len(), out.table.len());
        assert_eq!(back.labels, out.labels);
    }
}
