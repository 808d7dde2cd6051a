//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (the tests below pin the table layouts)

use crate::anomaly::AnomalyLabels;
use crate::app::pipeline::{DashboardRun, Section};
use crate::domain::{AnomalyLabel, Column, FeatureTable};
use crate::forecast::Forecast;
use crate::report::{CorrelationMatrix, Histogram, SummaryStats};

/// Rows shown in the raw-data tail.
pub const TAIL_ROWS: usize = 5;

/// Format the whole report printed by `cdash analyze` and `cdash show`.
pub fn format_report(run: &DashboardRun) -> String {
    let mut out = String::new();

    out.push_str(&format_run_header(run));
    out.push_str(&section_warnings(run, Section::Data));

    out.push_str("\nClose price statistics:\n");
    out.push_str(&format_summary_stats(run.summary.close.as_ref()));
    out.push_str(&section_warnings(run, Section::Indicators));

    out.push_str("\nCorrelation matrix:\n");
    out.push_str(&format_correlation(&run.summary.correlation));

    out.push_str("\nDaily returns distribution:\n");
    match &run.summary.returns_histogram {
        Some(h) => out.push_str(&format_histogram(h, 40)),
        None => out.push_str("(no returns)\n"),
    }

    out.push_str("\nAnomalies:\n");
    match &run.labels {
        Some(labels) => out.push_str(&format_anomalies(&run.table, labels)),
        None => out.push_str("(not available)\n"),
    }
    out.push_str(&section_warnings(run, Section::Anomalies));

    out.push_str("\nForecast:\n");
    match &run.forecast {
        Some(f) => out.push_str(&format_forecast(f)),
        None => out.push_str("(not available)\n"),
    }
    out.push_str(&section_warnings(run, Section::Forecast));

    out.push_str("\nSentiment: ");
    match run.sentiment {
        Some(s) => out.push_str(&format!("{s:+.2} ({})\n", sentiment_word(s))),
        None => out.push_str("n/a\n"),
    }
    out.push_str(&section_warnings(run, Section::Sentiment));

    out.push_str(&format!("\nLast {TAIL_ROWS} rows:\n"));
    out.push_str(&format_tail(&run.table, run.labels.as_ref(), TAIL_ROWS));

    out
}

pub fn format_run_header(run: &DashboardRun) -> String {
    let w = run.config.windows;
    let mut out = String::new();
    out.push_str(&format!("=== cdash - {} Analysis Dashboard ===\n", run.config.symbol.usd_ticker()));
    out.push_str(&format!(
        "Range: {} .. {} ({} days) | source={}\n",
        run.start,
        run.end,
        run.table.len(),
        run.source
    ));
    out.push_str(&format!(
        "Windows: SMA {}/{} | volatility {} | RSI {}\n",
        w.short_window, w.long_window, w.volatility_window, w.rsi_window
    ));
    out.push_str(&format!(
        "Forecast: L={} h={} | contamination={:.3} | seed={}\n",
        run.config.forecast.window_len,
        run.config.forecast.horizon,
        run.config.anomaly.contamination,
        run.config.seed
    ));
    out
}

pub fn format_summary_stats(stats: Option<&SummaryStats>) -> String {
    let Some(s) = stats else {
        return "(no closes)\n".to_string();
    };
    let rows = [
        ("count", s.count as f64),
        ("mean", s.mean),
        ("std", s.std.unwrap_or(f64::NAN)),
        ("min", s.min),
        ("25%", s.q25),
        ("50%", s.q50),
        ("75%", s.q75),
        ("max", s.max),
    ];

    let mut out = String::new();
    for (name, v) in rows {
        let cell = if name == "count" {
            format!("{}", s.count)
        } else {
            fmt_price(Some(v))
        };
        out.push_str(&format!("{name:<6} {cell:>14}\n"));
    }
    out
}

pub fn format_correlation(matrix: &CorrelationMatrix) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<13}", ""));
    for c in &matrix.columns {
        out.push_str(&format!(" {:>12}", c.name()));
    }
    out.push('\n');

    for (c, row) in matrix.columns.iter().zip(&matrix.values) {
        out.push_str(&format!("{:<13}", c.name()));
        for v in row {
            let cell = v.map_or_else(|| "-".to_string(), |x| format!("{x:.3}"));
            out.push_str(&format!(" {cell:>12}"));
        }
        out.push('\n');
    }
    out
}

/// Horizontal bars, one line per bin, scaled to `width` characters.
pub fn format_histogram(hist: &Histogram, width: usize) -> String {
    let max = hist.max_count().max(1);
    let mut out = String::new();
    for (i, &count) in hist.counts.iter().enumerate() {
        let len = (count * width).div_ceil(max);
        let line = format!(
            "{:>+9.4} .. {:>+9.4} | {:<width$} {count}\n",
            hist.edges[i],
            hist.edges[i + 1],
            "#".repeat(len),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn format_anomalies(table: &FeatureTable, labels: &AnomalyLabels) -> String {
    let mut out = format!(
        "{} of {} scored days flagged by {}\n",
        labels.anomalous_count(),
        labels.scored_count(),
        labels.model
    );
    for (row, label) in table.rows.iter().zip(&labels.labels) {
        if *label == Some(AnomalyLabel::Anomalous) {
            out.push_str(&format!(
                "  {}  close={}  return={}\n",
                row.bar.date,
                fmt_price(row.bar.close),
                fmt_pct(row.indicators.daily_return)
            ));
        }
    }
    out
}

pub fn format_forecast(forecast: &Forecast) -> String {
    let mut out = format!(
        "{} from {} closes ending {}\n",
        forecast.model,
        forecast.window.closes.len(),
        forecast.window.end_date
    );
    for p in &forecast.predictions {
        out.push_str(&format!("  {}  {}\n", p.date, fmt_price(Some(p.close))));
    }
    out
}

/// The last `n` rows of the feature table.
pub fn format_tail(table: &FeatureTable, labels: Option<&AnomalyLabels>, n: usize) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>12} {:>14} {:>12} {:>12} {:>9} {:>9} {:>6} {:<9}\n",
            "date", "close", "volume", "sma_short", "sma_long", "return", "vol", "rsi", "label"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<12} {:-<14} {:-<12} {:-<12} {:-<9} {:-<9} {:-<6} {:-<9}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    let start = table.len().saturating_sub(n);
    for (i, row) in table.rows.iter().enumerate().skip(start) {
        let label = labels
            .and_then(|l| l.labels.get(i).copied().flatten())
            .map_or("-", AnomalyLabel::as_str);
        out.push_str(
            format!(
                "{:<10} {:>12} {:>14} {:>12} {:>12} {:>9} {:>9} {:>6} {:<9}\n",
                row.bar.date,
                fmt_price(row.bar.close),
                fmt_volume(row.bar.volume),
                fmt_price(FeatureTable::value(row, Column::SmaShort)),
                fmt_price(FeatureTable::value(row, Column::SmaLong)),
                fmt_pct(row.indicators.daily_return),
                fmt_pct(row.indicators.volatility),
                row.indicators.rsi.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")),
                label,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn section_warnings(run: &DashboardRun, section: Section) -> String {
    run.warnings_for(section)
        .map(|w| format!("! {}: {}\n", section.title(), w.message))
        .collect()
}

fn sentiment_word(score: f64) -> &'static str {
    if score > 0.2 {
        "bullish"
    } else if score < -0.2 {
        "bearish"
    } else {
        "neutral"
    }
}

/// Prices span five orders of magnitude across symbols (BTC vs ADA).
fn fmt_price(v: Option<f64>) -> String {
    match v {
        Some(x) if !x.is_finite() => "-".to_string(),
        Some(x) if x.abs() >= 1000.0 => format!("{x:.2}"),
        Some(x) if x.abs() >= 1.0 => format!("{x:.3}"),
        Some(x) => format!("{x:.5}"),
        None => "-".to_string(),
    }
}

fn fmt_volume(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.0}"))
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{:+.2}%", x * 100.0))
}
