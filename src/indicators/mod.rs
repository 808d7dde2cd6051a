//! Indicator engine: moving averages, returns, volatility, RSI.
//!
//! Every indicator is a pure function over a column of `Option<f64>` so that
//! undefined cells (warm-up windows, missing prices, zero division) stay visible
//! as `None` instead of aborting the run.

pub mod moving_average;
pub mod returns;
pub mod rsi;
pub mod volatility;

use chrono::NaiveDate;

pub use moving_average::simple_moving_average;
pub use returns::{DailyReturns, daily_returns};
pub use rsi::relative_strength_index;
pub use volatility::rolling_volatility;

use crate::domain::{IndicatorRow, Series, WindowConfig};
use crate::error::AppError;

/// Raw engine output: one row per bar, plus cell-level warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub rows: Vec<IndicatorRow>,
    /// Dates whose daily return divided by a zero previous close.
    pub zero_division: Vec<NaiveDate>,
}

/// Validated indicator configuration.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorEngine {
    windows: WindowConfig,
}

impl IndicatorEngine {
    /// Reject invalid window parameters before any data is touched.
    pub fn new(windows: WindowConfig) -> Result<Self, AppError> {
        windows.validate()?;
        Ok(Self { windows })
    }

    pub fn windows(&self) -> WindowConfig {
        self.windows
    }

    /// Compute all indicators for a (gap-filled) series.
    pub fn compute(&self, series: &Series) -> Result<IndicatorSet, AppError> {
        if let Some(bar) = series.first_negative() {
            return Err(AppError::config(format!(
                "negative price or volume on {} for {}",
                bar.date,
                series.symbol()
            )));
        }

        let closes = series.closes();
        let w = self.windows;

        let sma_short = simple_moving_average(&closes, w.short_window);
        let sma_long = simple_moving_average(&closes, w.long_window);
        let DailyReturns {
            values: returns,
            zero_division,
        } = daily_returns(&closes);
        let volatility = rolling_volatility(&returns, w.volatility_window);
        let rsi = relative_strength_index(&closes, w.rsi_window);

        let rows = (0..closes.len())
            .map(|t| IndicatorRow {
                sma_short: sma_short[t],
                sma_long: sma_long[t],
                daily_return: returns[t],
                volatility: volatility[t],
                rsi: rsi[t],
            })
            .collect();

        let dates = series.dates();
        let zero_division: Vec<NaiveDate> = zero_division.into_iter().map(|t| dates[t]).collect();

        tracing::debug!(
            symbol = %series.symbol(),
            rows = closes.len(),
            short = w.short_window,
            long = w.long_window,
            volatility = w.volatility_window,
            rsi = w.rsi_window,
            zero_division = zero_division.len(),
            "computed indicators"
        );

        Ok(IndicatorSet {
            rows,
            zero_division,
        })
    }
}
