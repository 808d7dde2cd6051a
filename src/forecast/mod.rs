//! Forecast preparation: scaling, windowing, auto-regressive rollout.
//!
//! Workflow for one run:
//!
//! ```text
//! closes -> MinMaxScaler -> stride-1 windows of length L (+ next value as target)
//!        -> SequenceModel::fit -> rollout `horizon` steps from the latest window
//!        -> inverse scaling -> PricePrediction per future day
//! ```

pub mod autoregressive;
pub mod scaler;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub use autoregressive::LinearAutoregressor;
pub use scaler::MinMaxScaler;

use crate::domain::{Column, FeatureTable, ForecastConfig, ForecastWindow, PricePrediction};
use crate::error::AppError;

/// A supervised training example: `L` consecutive values and the one after.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub inputs: Vec<f64>,
    pub target: f64,
}

/// A model that predicts the next value of a scaled sequence.
pub trait SequenceModel {
    fn name(&self) -> &str;

    fn fit(&mut self, pairs: &[TrainingPair]) -> Result<(), AppError>;

    fn predict_next(&self, window: &[f64]) -> Result<f64, AppError>;

    /// Roll out `horizon` predictions, feeding each one back as the newest
    /// window element.
    fn forecast(&self, window: &[f64], horizon: usize) -> Result<Vec<f64>, AppError> {
        let mut window = window.to_vec();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = self.predict_next(&window)?;
            out.push(next);
            if !window.is_empty() {
                window.rotate_left(1);
                let last = window.len() - 1;
                window[last] = next;
            }
        }
        Ok(out)
    }
}

/// Overlapping windows of length `window_len`, stride 1, each paired with the
/// following value.
pub fn training_pairs(values: &[f64], window_len: usize) -> Result<Vec<TrainingPair>, AppError> {
    if window_len == 0 || values.len() <= window_len {
        return Err(AppError::InsufficientData {
            needed: window_len + 1,
            available: values.len(),
        });
    }
    Ok(values
        .windows(window_len + 1)
        .map(|w| TrainingPair {
            inputs: w[..window_len].to_vec(),
            target: w[window_len],
        })
        .collect())
}

/// Forecast output in original price units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: String,
    pub window: ForecastWindow,
    pub predictions: Vec<PricePrediction>,
}

/// Prepares inputs for a `SequenceModel` and turns its output back into prices.
#[derive(Debug, Clone, Copy)]
pub struct ForecastPreparer {
    config: ForecastConfig,
}

impl ForecastPreparer {
    pub fn new(config: ForecastConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Fit `model` on the table's closes and forecast `horizon` days ahead.
    pub fn run_table(&self, model: &mut dyn SequenceModel, table: &FeatureTable) -> Result<Forecast, AppError> {
        let (closes, end_date) = trailing_closes(table)?;
        self.run(model, &closes, end_date)
    }

    /// Fit on `closes` (ending at `end_date`) and forecast `horizon` days ahead.
    pub fn run(
        &self,
        model: &mut dyn SequenceModel,
        closes: &[f64],
        end_date: NaiveDate,
    ) -> Result<Forecast, AppError> {
        let ForecastConfig { window_len, horizon } = self.config;

        let scaler = MinMaxScaler::fit(closes)?;
        let scaled = scaler.transform_all(closes);
        let pairs = training_pairs(&scaled, window_len)?;
        model.fit(&pairs)?;

        let latest = &scaled[scaled.len() - window_len..];
        let predicted = model.forecast(latest, horizon)?;
        if predicted.len() != horizon {
            return Err(AppError::external(
                model.name(),
                format!("returned {} predictions for a horizon of {horizon}", predicted.len()),
            ));
        }
        if predicted.iter().any(|v| !v.is_finite()) {
            return Err(AppError::external(model.name(), "produced a non-finite prediction"));
        }

        let predictions = predicted
            .iter()
            .enumerate()
            .map(|(i, &v)| PricePrediction {
                date: end_date + Duration::days(i as i64 + 1),
                close: scaler.inverse(v),
            })
            .collect();

        tracing::info!(
            model = model.name(),
            training_pairs = pairs.len(),
            window_len,
            horizon,
            "forecast complete"
        );

        Ok(Forecast {
            model: model.name().to_string(),
            window: ForecastWindow {
                end_date,
                closes: closes[closes.len() - window_len..].to_vec(),
            },
            predictions,
        })
    }
}

/// The longest run of present closes ending at the last row.
fn trailing_closes(table: &FeatureTable) -> Result<(Vec<f64>, NaiveDate), AppError> {
    let end_date = table.last_date().ok_or(AppError::InsufficientData {
        needed: 1,
        available: 0,
    })?;
    let mut closes: Vec<f64> = table
        .column(Column::Close)
        .into_iter()
        .rev()
        .map_while(|c| c)
        .collect();
    closes.reverse();
    Ok((closes, end_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, FeatureRow, IndicatorRow, Symbol, WindowConfig};

    /// Always predicts the mean of its window.
    struct WindowMean;

    impl SequenceModel for WindowMean {
        fn name(&self) -> &str {
            "window-mean"
        }

        fn fit(&mut self, _: &[TrainingPair]) -> Result<(), AppError> {
            Ok(())
        }

        fn predict_next(&self, window: &[f64]) -> Result<f64, AppError> {
            Ok(window.iter().sum::<f64>() / window.len() as f64)
        }
    }

    /// Ignores the horizon.
    struct OneShot;

    impl SequenceModel for OneShot {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn fit(&mut self, _: &[TrainingPair]) -> Result<(), AppError> {
            Ok(())
        }

        fn predict_next(&self, _: &[f64]) -> Result<f64, AppError> {
            Ok(0.0)
        }

        fn forecast(&self, _: &[f64], _: usize) -> Result<Vec<f64>, AppError> {
            Ok(vec![0.0])
        }
    }

    fn table(closes: &[Option<f64>]) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        FeatureTable {
            symbol: Symbol::Eth,
            windows: WindowConfig::default(),
            rows: closes
                .iter()
                .enumerate()
                .map(|(i, &c)| FeatureRow {
                    bar: Bar::from_close(start + Duration::days(i as i64), c),
                    indicators: IndicatorRow::default(),
                })
                .collect(),
        }
    }

    fn preparer(window_len: usize, horizon: usize) -> ForecastPreparer {
        ForecastPreparer::new(ForecastConfig { window_len, horizon }).unwrap()
    }

    #[test]
    fn training_pairs_use_stride_one() {
        let pairs = training_pairs(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].inputs, vec![1.0, 2.0]);
        assert_eq!(pairs[0].target, 3.0);
        assert_eq!(pairs[1].inputs, vec![2.0, 3.0]);
        assert_eq!(pairs[1].target, 4.0);
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let err = training_pairs(&[1.0, 2.0], 2).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { needed: 3, available: 2 }));
    }

    #[test]
    fn rollout_feeds_predictions_back() {
        let out = WindowMean.forecast(&[0.0, 1.0], 3).unwrap();
        // [0,1] -> 0.5; [1,0.5] -> 0.75; [0.5,0.75] -> 0.625
        assert_eq!(out, vec![0.5, 0.75, 0.625]);
    }

    #[test]
    fn horizon_is_always_honoured() {
        let closes: Vec<Option<f64>> = (1..=30).map(|i| Some(f64::from(i))).collect();
        let t = table(&closes);
        for h in 1..=10 {
            let forecast = preparer(5, h).run_table(&mut WindowMean, &t).unwrap();
            assert_eq!(forecast.predictions.len(), h);
        }
    }

    #[test]
    fn predictions_are_dated_after_last_row_in_price_units() {
        let closes: Vec<Option<f64>> = (0..30).map(|i| Some(100.0 + 2.0 * f64::from(i))).collect();
        let t = table(&closes);
        let mut model = LinearAutoregressor::new();
        let forecast = preparer(5, 3).run_table(&mut model, &t).unwrap();

        let last = t.last_date().unwrap();
        assert_eq!(forecast.window.end_date, last);
        assert_eq!(forecast.window.closes.len(), 5);
        for (i, p) in forecast.predictions.iter().enumerate() {
            assert_eq!(p.date, last + Duration::days(i as i64 + 1));
            let expected = 100.0 + 2.0 * (30.0 + i as f64);
            assert!((p.close - expected).abs() < 1e-4, "{} vs {expected}", p.close);
        }
    }

    #[test]
    fn constant_prices_forecast_the_constant() {
        let t = table(&vec![Some(250.0); 20]);
        let mut model = LinearAutoregressor::new();
        let forecast = preparer(4, 2).run_table(&mut model, &t).unwrap();
        for p in &forecast.predictions {
            assert!((p.close - 250.0).abs() < 1e-9);
        }
    }

    #[test]
    fn leading_gap_is_excluded_from_training() {
        let mut closes = vec![None, None];
        closes.extend((0..10).map(|i| Some(f64::from(i))));
        let (values, _) = trailing_closes(&table(&closes)).unwrap();
        assert_eq!(values.len(), 10);
    }

    #[test]
    fn model_ignoring_horizon_is_an_external_error() {
        let closes: Vec<Option<f64>> = (1..=20).map(|i| Some(f64::from(i))).collect();
        let err = preparer(3, 4).run_table(&mut OneShot, &table(&closes)).unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }));
    }

    #[test]
    fn zero_horizon_is_a_configuration_error() {
        let err = ForecastPreparer::new(ForecastConfig { window_len: 3, horizon: 0 }).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
