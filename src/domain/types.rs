//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during a single dashboard run
//! - exported to JSON/CSV
//! - reloaded later for rendering (`cdash show`)

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::WindowConfig;
use crate::error::AppError;

/// Supported cryptocurrencies (quoted in USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    #[value(name = "BTC", alias = "btc")]
    Btc,
    #[value(name = "ETH", alias = "eth")]
    Eth,
    #[value(name = "XRP", alias = "xrp")]
    Xrp,
    #[value(name = "LTC", alias = "ltc")]
    Ltc,
    #[value(name = "ADA", alias = "ada")]
    Ada,
}

impl Symbol {
    pub const ALL: [Symbol; 5] = [Symbol::Btc, Symbol::Eth, Symbol::Xrp, Symbol::Ltc, Symbol::Ada];

    pub fn code(self) -> &'static str {
        match self {
            Symbol::Btc => "BTC",
            Symbol::Eth => "ETH",
            Symbol::Xrp => "XRP",
            Symbol::Ltc => "LTC",
            Symbol::Ada => "ADA",
        }
    }

    /// Ticker used by USD-quoted market data feeds, e.g. `BTC-USD`.
    pub fn usd_ticker(self) -> String {
        format!("{}-USD", self.code())
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One calendar day's market record.
///
/// Missing values (non-trading days, fetch gaps) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// A bar with only a close price (handy for tests and synthetic data).
    pub fn from_close(date: NaiveDate, close: Option<f64>) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
        }
    }

    fn prices(&self) -> [Option<f64>; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// An ordered, date-keyed sequence of bars for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    symbol: Symbol,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series, rejecting duplicate or out-of-order dates.
    pub fn new(symbol: Symbol, bars: Vec<Bar>) -> Result<Self, AppError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AppError::unavailable(format!(
                    "{symbol} series dates must be strictly increasing ({} then {})",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// First bar carrying a negative price or volume, if any.
    pub fn first_negative(&self) -> Option<&Bar> {
        self.bars.iter().find(|b| {
            b.prices().iter().chain(std::iter::once(&b.volume)).any(|v| matches!(v, Some(x) if *x < 0.0))
        })
    }

    /// Replace the close/volume columns, keeping dates and OHLC untouched.
    pub(crate) fn with_close_volume(&self, closes: Vec<Option<f64>>, volumes: Vec<Option<f64>>) -> Self {
        let bars = self
            .bars
            .iter()
            .zip(closes)
            .zip(volumes)
            .map(|((bar, close), volume)| Bar {
                close,
                volume,
                ..bar.clone()
            })
            .collect();
        Self {
            symbol: self.symbol,
            bars,
        }
    }
}

/// Derived indicator values for one date. All nullable during warm-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub daily_return: Option<f64>,
    pub volatility: Option<f64>,
    pub rsi: Option<f64>,
}

/// A bar joined with its indicator row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub bar: Bar,
    #[serde(flatten)]
    pub indicators: IndicatorRow,
}

/// Named numeric columns of a [`FeatureTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Close,
    Volume,
    DailyReturn,
    Volatility,
    SmaShort,
    SmaLong,
    Rsi,
}

impl Column {
    /// Columns handed to the outlier model, in matrix column order.
    pub const ANOMALY_FEATURES: [Column; 4] =
        [Column::Close, Column::Volume, Column::DailyReturn, Column::Volatility];

    pub fn name(self) -> &'static str {
        match self {
            Column::Close => "close",
            Column::Volume => "volume",
            Column::DailyReturn => "daily_return",
            Column::Volatility => "volatility",
            Column::SmaShort => "sma_short",
            Column::SmaLong => "sma_long",
            Column::Rsi => "rsi",
        }
    }
}

/// The single structure passed to anomaly scoring, forecasting and presentation.
///
/// One row per date of the input series, in input order. The column set is fixed
/// by `windows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub symbol: Symbol,
    pub windows: WindowConfig,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.bar.date).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.bar.date)
    }

    pub fn value(row: &FeatureRow, column: Column) -> Option<f64> {
        match column {
            Column::Close => row.bar.close,
            Column::Volume => row.bar.volume,
            Column::DailyReturn => row.indicators.daily_return,
            Column::Volatility => row.indicators.volatility,
            Column::SmaShort => row.indicators.sma_short,
            Column::SmaLong => row.indicators.sma_long,
            Column::Rsi => row.indicators.rsi,
        }
    }

    pub fn column(&self, column: Column) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| Self::value(r, column)).collect()
    }
}

/// Per-row anomaly tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl AnomalyLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyLabel::Normal => "normal",
            AnomalyLabel::Anomalous => "anomalous",
        }
    }
}

/// The most recent `L` closes, used as forecast model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWindow {
    pub end_date: NaiveDate,
    pub closes: Vec<f64>,
}

/// One predicted future close, in original price units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub date: NaiveDate,
    pub close: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let bars = vec![Bar::from_close(d(1), Some(1.0)), Bar::from_close(d(1), Some(2.0))];
        let err = Series::new(Symbol::Btc, bars).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[test]
    fn series_rejects_descending_dates() {
        let bars = vec![Bar::from_close(d(2), Some(1.0)), Bar::from_close(d(1), Some(2.0))];
        assert!(Series::new(Symbol::Eth, bars).is_err());
    }

    #[test]
    fn first_negative_finds_bad_bar() {
        let mut bad = Bar::from_close(d(2), Some(5.0));
        bad.low = Some(-1.0);
        let series = Series::new(Symbol::Btc, vec![Bar::from_close(d(1), Some(1.0)), bad]).unwrap();
        assert_eq!(series.first_negative().map(|b| b.date), Some(d(2)));
    }

    #[test]
    fn symbol_cycles_through_all() {
        let mut s = Symbol::Btc;
        for _ in 0..Symbol::ALL.len() {
            s = s.next();
        }
        assert_eq!(s, Symbol::Btc);
        assert_eq!(Symbol::Btc.prev(), Symbol::Ada);
        assert_eq!(Symbol::Xrp.usd_ticker(), "XRP-USD");
    }
}
