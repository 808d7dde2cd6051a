//! Anomaly scoring adapter.
//!
//! The pipeline only knows the `OutlierModel` contract: a numeric feature matrix
//! in, one `{outlier, inlier}` label per row out. `AnomalyScorer` builds that
//! matrix from the feature table and maps the labels back onto dates.

pub mod isolation_forest;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub use isolation_forest::IsolationForest;

use crate::domain::{AnomalyLabel, Column, FeatureTable};
use crate::error::AppError;

/// Output space of an outlier-detection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelLabel {
    Outlier,
    Inlier,
}

impl From<ModelLabel> for AnomalyLabel {
    fn from(value: ModelLabel) -> Self {
        match value {
            ModelLabel::Outlier => AnomalyLabel::Anomalous,
            ModelLabel::Inlier => AnomalyLabel::Normal,
        }
    }
}

/// An unsupervised outlier detector.
pub trait OutlierModel {
    fn name(&self) -> &str;

    /// Fit on `features` (rows = observations) and label every row.
    fn fit_predict(&mut self, features: &DMatrix<f64>) -> Result<Vec<ModelLabel>, AppError>;
}

/// Per-row labels for a feature table.
///
/// `None` marks rows whose features were still missing after gap filling (a
/// leading price gap or a feed without volume); those rows are never sent to
/// the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyLabels {
    pub model: String,
    pub labels: Vec<Option<AnomalyLabel>>,
}

impl AnomalyLabels {
    pub fn anomalous_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|l| **l == Some(AnomalyLabel::Anomalous))
            .count()
    }

    pub fn scored_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }
}

/// Build the model's feature matrix: `close, volume, daily_return, volatility`.
///
/// Returns the matrix and the table row index of each matrix row.
pub fn feature_matrix(table: &FeatureTable) -> (DMatrix<f64>, Vec<usize>) {
    let mut values = Vec::new();
    let mut index = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        let cells: Option<Vec<f64>> = Column::ANOMALY_FEATURES
            .iter()
            .map(|&c| FeatureTable::value(row, c))
            .collect();
        if let Some(cells) = cells {
            values.extend(cells);
            index.push(i);
        }
    }

    let matrix = DMatrix::from_row_slice(index.len(), Column::ANOMALY_FEATURES.len(), &values);
    (matrix, index)
}

/// Pass-through adapter over an `OutlierModel`.
pub struct AnomalyScorer<'a> {
    model: &'a mut dyn OutlierModel,
}

impl<'a> AnomalyScorer<'a> {
    pub fn new(model: &'a mut dyn OutlierModel) -> Self {
        Self { model }
    }

    pub fn label(&mut self, table: &FeatureTable) -> Result<AnomalyLabels, AppError> {
        let (matrix, index) = feature_matrix(table);
        if index.len() < 2 {
            return Err(AppError::InsufficientData {
                needed: 2,
                available: index.len(),
            });
        }

        let predicted = self.model.fit_predict(&matrix)?;
        if predicted.len() != index.len() {
            return Err(AppError::external(
                self.model.name(),
                format!("returned {} labels for {} rows", predicted.len(), index.len()),
            ));
        }

        let mut labels = vec![None; table.len()];
        for (row, label) in index.into_iter().zip(predicted) {
            labels[row] = Some(AnomalyLabel::from(label));
        }

        let out = AnomalyLabels {
            model: self.model.name().to_string(),
            labels,
        };
        tracing::info!(
            model = %out.model,
            scored = out.scored_count(),
            anomalous = out.anomalous_count(),
            "labelled anomalies"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, FeatureRow, IndicatorRow, Symbol, WindowConfig};
    use chrono::NaiveDate;

    /// Flags every row whose close exceeds a fixed level.
    struct Threshold(f64);

    impl OutlierModel for Threshold {
        fn name(&self) -> &str {
            "threshold"
        }

        fn fit_predict(&mut self, features: &DMatrix<f64>) -> Result<Vec<ModelLabel>, AppError> {
            assert_eq!(features.ncols(), 4);
            Ok((0..features.nrows())
                .map(|r| {
                    if features[(r, 0)] > self.0 {
                        ModelLabel::Outlier
                    } else {
                        ModelLabel::Inlier
                    }
                })
                .collect())
        }
    }

    struct Truncating;

    impl OutlierModel for Truncating {
        fn name(&self) -> &str {
            "truncating"
        }

        fn fit_predict(&mut self, _: &DMatrix<f64>) -> Result<Vec<ModelLabel>, AppError> {
            Ok(vec![ModelLabel::Inlier])
        }
    }

    fn table(rows: &[(Option<f64>, Option<f64>)]) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| FeatureRow {
                bar: Bar {
                    volume,
                    ..Bar::from_close(start + chrono::Duration::days(i as i64), close)
                },
                indicators: IndicatorRow {
                    daily_return: Some(0.0),
                    volatility: Some(0.0),
                    ..IndicatorRow::default()
                },
            })
            .collect();
        FeatureTable {
            symbol: Symbol::Btc,
            windows: WindowConfig::default(),
            rows,
        }
    }

    #[test]
    fn model_labels_map_onto_rows() {
        let t = table(&[(Some(1.0), Some(5.0)), (Some(9.0), Some(5.0)), (Some(2.0), Some(5.0))]);
        let mut model = Threshold(5.0);
        let labels = AnomalyScorer::new(&mut model).label(&t).unwrap();
        assert_eq!(
            labels.labels,
            vec![
                Some(AnomalyLabel::Normal),
                Some(AnomalyLabel::Anomalous),
                Some(AnomalyLabel::Normal)
            ]
        );
        assert_eq!(labels.anomalous_count(), 1);
        assert_eq!(labels.model, "threshold");
    }

    #[test]
    fn incomplete_rows_are_not_sent_to_the_model() {
        let t = table(&[(None, Some(5.0)), (Some(9.0), Some(5.0)), (Some(2.0), Some(5.0))]);
        let (matrix, index) = feature_matrix(&t);
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(index, vec![1, 2]);

        let mut model = Threshold(5.0);
        let labels = AnomalyScorer::new(&mut model).label(&t).unwrap();
        assert_eq!(labels.labels[0], None);
        assert_eq!(labels.scored_count(), 2);
    }

    #[test]
    fn missing_volume_feed_is_insufficient() {
        let t = table(&[(Some(1.0), None), (Some(2.0), None), (Some(3.0), None)]);
        let mut model = Threshold(5.0);
        let err = AnomalyScorer::new(&mut model).label(&t).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { available: 0, .. }));
    }

    #[test]
    fn label_count_mismatch_is_an_external_error() {
        let t = table(&[(Some(1.0), Some(1.0)), (Some(2.0), Some(1.0))]);
        let mut model = Truncating;
        let err = AnomalyScorer::new(&mut model).label(&t).unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }));
    }

    #[test]
    fn feature_matrix_column_order_is_fixed() {
        let mut t = table(&[(Some(1.0), Some(2.0)), (Some(3.0), Some(4.0))]);
        t.rows[0].indicators.daily_return = Some(0.5);
        t.rows[0].indicators.volatility = Some(0.25);
        let (m, _) = feature_matrix(&t);
        assert_eq!(m.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 0.5, 0.25]);
    }
}
