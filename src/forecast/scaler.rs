//! Min-max scaling to `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fit on a non-empty slice of finite values.
    ///
    /// A constant input has zero range; it scales to `0.0` and inverts back to
    /// the constant.
    pub fn fit(values: &[f64]) -> Result<Self, AppError> {
        if values.is_empty() {
            return Err(AppError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::external("scaler", "cannot scale non-finite values"));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if max > min { max - min } else { 1.0 };
        Ok(Self { min, range })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_extremes_to_unit_interval() {
        let s = MinMaxScaler::fit(&[10.0, 20.0, 15.0]).unwrap();
        assert_eq!(s.transform_all(&[10.0, 20.0, 15.0]), vec![0.0, 1.0, 0.5]);
        assert!((s.inverse(0.25) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn constant_input_round_trips() {
        let s = MinMaxScaler::fit(&[7.0, 7.0]).unwrap();
        assert_eq!(s.transform(7.0), 0.0);
        assert_eq!(s.inverse(0.0), 7.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(MinMaxScaler::fit(&[]).is_err());
    }

    #[test]
    fn non_finite_input_is_a_recoverable_model_error() {
        let err = MinMaxScaler::fit(&[1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }), "{err}");
        assert!(!err.is_fatal());
    }
}
