//! Linear autoregressive sequence model.
//!
//! `x[t] = β0 + Σ_k β_k · x[t-L+k]`, fitted on the training windows by least
//! squares. Small, deterministic, and good enough to extend a trend a few days.

use nalgebra::{DMatrix, DVector};

use super::{SequenceModel, TrainingPair};
use crate::error::AppError;
use crate::math::solve_least_squares;

#[derive(Debug, Clone, Default)]
pub struct LinearAutoregressor {
    /// Intercept followed by one coefficient per lag (oldest first).
    coefficients: Option<DVector<f64>>,
}

impl LinearAutoregressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lags(&self) -> Option<usize> {
        self.coefficients.as_ref().map(|c| c.len() - 1)
    }
}

impl SequenceModel for LinearAutoregressor {
    fn name(&self) -> &str {
        "linear-ar"
    }

    fn fit(&mut self, pairs: &[TrainingPair]) -> Result<(), AppError> {
        let Some(first) = pairs.first() else {
            return Err(AppError::InsufficientData {
                needed: 1,
                available: 0,
            });
        };
        let lags = first.inputs.len();
        if pairs.iter().any(|p| p.inputs.len() != lags) {
            return Err(AppError::external(self.name(), "training windows differ in length"));
        }

        let x = DMatrix::from_fn(pairs.len(), lags + 1, |r, c| {
            if c == 0 { 1.0 } else { pairs[r].inputs[c - 1] }
        });
        let y = DVector::from_iterator(pairs.len(), pairs.iter().map(|p| p.target));

        let beta = solve_least_squares(&x, &y)
            .ok_or_else(|| AppError::external(self.name(), "least squares fit did not converge"))?;
        self.coefficients = Some(beta);
        Ok(())
    }

    fn predict_next(&self, window: &[f64]) -> Result<f64, AppError> {
        let beta = self
            .coefficients
            .as_ref()
            .ok_or_else(|| AppError::external(self.name(), "model has not been fitted"))?;
        if window.len() + 1 != beta.len() {
            return Err(AppError::external(
                self.name(),
                format!("expected a window of {}, got {}", beta.len() - 1, window.len()),
            ));
        }

        let value = beta[0] + window.iter().zip(beta.iter().skip(1)).map(|(x, b)| x * b).sum::<f64>();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::training_pairs;

    #[test]
    fn linear_trend_is_extended() {
        let series: Vec<f64> = (0..40).map(|i| 0.1 + 0.02 * f64::from(i)).collect();
        let pairs = training_pairs(&series, 5).unwrap();
        let mut model = LinearAutoregressor::new();
        model.fit(&pairs).unwrap();
        assert_eq!(model.lags(), Some(5));

        let window = &series[series.len() - 5..];
        let next = model.predict_next(window).unwrap();
        assert!((next - (0.1 + 0.02 * 40.0)).abs() < 1e-6, "next = {next}");
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let model = LinearAutoregressor::new();
        assert!(model.predict_next(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn wrong_window_length_is_rejected() {
        let series: Vec<f64> = (0..10).map(f64::from).collect();
        let mut model = LinearAutoregressor::new();
        model.fit(&training_pairs(&series, 3).unwrap()).unwrap();
        assert!(model.predict_next(&[1.0, 2.0]).is_err());
    }
}
