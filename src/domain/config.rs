//! Run configuration.
//!
//! `DashboardConfig` replaces the implicit "current widget values" with one
//! explicit structure passed into the pipeline entry point. It is built from CLI
//! flags (see `app::dashboard_config_from_args`) or adjusted in place by the TUI.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::Symbol;
use crate::error::AppError;

/// Input bounds mirrored from the dashboard sliders: (min, max, default).
pub const HORIZON_DAYS: (u32, u32, u32) = (30, 365, 90);
pub const SHORT_WINDOW: (usize, usize, usize) = (5, 50, 20);
pub const LONG_WINDOW: (usize, usize, usize) = (20, 200, 50);
pub const VOLATILITY_WINDOW: (usize, usize, usize) = (5, 30, 14);
pub const DEFAULT_RSI_WINDOW: usize = 14;

/// Indicator window sizes. Defines the feature table's column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub volatility_window: usize,
    pub rsi_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            short_window: SHORT_WINDOW.2,
            long_window: LONG_WINDOW.2,
            volatility_window: VOLATILITY_WINDOW.2,
            rsi_window: DEFAULT_RSI_WINDOW,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let named = [
            ("short_window", self.short_window),
            ("long_window", self.long_window),
            ("volatility_window", self.volatility_window),
            ("rsi_window", self.rsi_window),
        ];
        for (name, value) in named {
            if value < 2 {
                return Err(AppError::config(format!("{name} must be >= 2 (got {value})")));
            }
        }
        if self.short_window >= self.long_window {
            return Err(AppError::config(format!(
                "short_window ({}) must be smaller than long_window ({})",
                self.short_window, self.long_window
            )));
        }
        Ok(())
    }
}

/// Forecast window length `L` and number of future steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub window_len: usize,
    pub horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_len: 30,
            horizon: 7,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.window_len == 0 {
            return Err(AppError::config("forecast window length must be >= 1"));
        }
        if self.horizon == 0 {
            return Err(AppError::config("forecast horizon must be >= 1"));
        }
        Ok(())
    }
}

/// Outlier model settings. Fixed per run; the adapter never tunes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub contamination: f64,
    pub n_trees: usize,
    pub max_samples: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            n_trees: 100,
            max_samples: 256,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.contamination.is_finite() && self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(AppError::config(format!(
                "contamination must be in (0, 0.5] (got {})",
                self.contamination
            )));
        }
        if self.n_trees == 0 || self.max_samples < 2 {
            return Err(AppError::config("isolation forest needs >= 1 tree and >= 2 samples per tree"));
        }
        Ok(())
    }
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub symbol: Symbol,
    /// Number of calendar days of history to analyze.
    pub horizon_days: u32,
    /// Last day of the analysis range (`None` = today).
    pub end_date: Option<NaiveDate>,
    pub windows: WindowConfig,
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub seed: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            symbol: Symbol::Btc,
            horizon_days: HORIZON_DAYS.2,
            end_date: None,
            windows: WindowConfig::default(),
            forecast: ForecastConfig::default(),
            anomaly: AnomalyConfig::default(),
            seed: 42,
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(HORIZON_DAYS.0..=HORIZON_DAYS.1).contains(&self.horizon_days) {
            return Err(AppError::config(format!(
                "horizon_days must be within {}..={} (got {})",
                HORIZON_DAYS.0, HORIZON_DAYS.1, self.horizon_days
            )));
        }
        self.windows.validate()?;
        self.forecast.validate()?;
        self.anomaly.validate()
    }

    /// `(start, end)` of the fetch, given today's date.
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or(today);
        let start = end - Duration::days(i64::from(self.horizon_days));
        (start, end)
    }
}
