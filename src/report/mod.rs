//! Reporting utilities: summary statistics, correlations, histograms, and
//! formatted terminal output.

pub mod format;

use serde::{Deserialize, Serialize};

pub use format::*;

use crate::domain::{Column, FeatureTable};
use crate::math::{mean, pearson_pairwise, quantile_sorted, sample_std};

/// Number of bins in the daily-returns histogram.
pub const HISTOGRAM_BINS: usize = 50;

/// Columns shown in the correlation matrix.
pub const CORRELATION_COLUMNS: [Column; 4] = Column::ANOMALY_FEATURES;

/// `describe()`-style statistics for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single observation.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summarize the present, finite values of a column. `None` if there are none.
pub fn summarize(values: &[Option<f64>]) -> Option<SummaryStats> {
    let mut xs: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);

    Some(SummaryStats {
        count: xs.len(),
        mean: mean(&xs)?,
        std: sample_std(&xs),
        min: xs[0],
        q25: quantile_sorted(&xs, 0.25)?,
        q50: quantile_sorted(&xs, 0.50)?,
        q75: quantile_sorted(&xs, 0.75)?,
        max: xs[xs.len() - 1],
    })
}

/// Pairwise-complete Pearson correlations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<Column>,
    /// Row-major; `None` where a pair has too few observations or no variance.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Column, b: Column) -> Option<f64> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        self.values[i][j]
    }
}

pub fn correlation_matrix(table: &FeatureTable, columns: &[Column]) -> CorrelationMatrix {
    let data: Vec<Vec<Option<f64>>> = columns.iter().map(|&c| table.column(c)).collect();
    let values = data
        .iter()
        .map(|a| data.iter().map(|b| pearson_pairwise(a, b)).collect())
        .collect();
    CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    }
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Bin the present, finite values into `bins` equal-width buckets over
/// `[min, max]`; the last bucket includes `max`. A constant column uses
/// `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[Option<f64>], bins: usize) -> Option<Histogram> {
    let xs: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if xs.is_empty() || bins == 0 {
        return None;
    }

    let mut lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for x in xs {
        let idx = (((x - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}

/// Statistics shown next to the charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub close: Option<SummaryStats>,
    pub correlation: CorrelationMatrix,
    pub returns_histogram: Option<Histogram>,
}

pub fn summarize_table(table: &FeatureTable) -> DashboardSummary {
    DashboardSummary {
        close: summarize(&table.column(Column::Close)),
        correlation: correlation_matrix(table, &CORRELATION_COLUMNS),
        returns_histogram: histogram(&table.column(Column::DailyReturn), HISTOGRAM_BINS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_linear_quantiles() {
        let values = vec![Some(3.0), Some(1.0), Some(4.0), Some(2.0), Some(f64::NAN), None];
        let s = summarize(&values).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.std.unwrap() - 1.290_994_448_7).abs() < 1e-9);
        assert_eq!(s.min, 1.0);
        assert!((s.q25 - 1.75).abs() < 1e-12);
        assert!((s.q50 - 2.5).abs() < 1e-12);
        assert!((s.q75 - 3.25).abs() < 1e-12);
        assert_eq!(s.max, 4.0);
    }

    #[test]
    fn describe_of_nothing_is_none() {
        assert!(summarize(&[None, None]).is_none());
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let values: Vec<Option<f64>> = (0..=100).map(|i| Some(f64::from(i))).collect();
        let h = histogram(&values, 50).unwrap();
        assert_eq!(h.counts.len(), 50);
        assert_eq!(h.edges.len(), 51);
        assert_eq!(h.total(), 101);
        // The maximum lands in the last bin, not past it.
        assert_eq!(h.counts[49], 3);
    }

    #[test]
    fn constant_histogram_has_unit_span() {
        let h = histogram(&[Some(0.0), Some(0.0)], 4).unwrap();
        assert_eq!(h.edges[0], -0.5);
        assert_eq!(h.edges[4], 0.5);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        use crate::domain::{Bar, FeatureRow, IndicatorRow, Symbol, WindowConfig};
        use chrono::{Duration, NaiveDate};

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let rows = (0..10)
            .map(|i| FeatureRow {
                bar: Bar {
                    volume: Some(100.0 - f64::from(i)),
                    ..Bar::from_close(start + Duration::days(i64::from(i)), Some(f64::from(i)))
                },
                indicators: IndicatorRow {
                    daily_return: Some(f64::from(i % 3)),
                    volatility: Some(0.0),
                    ..IndicatorRow::default()
                },
            })
            .collect();
        let table = FeatureTable {
            symbol: Symbol::Btc,
            windows: WindowConfig::default(),
            rows,
        };

        let m = correlation_matrix(&table, &CORRELATION_COLUMNS);
        assert!((m.get(Column::Close, Column::Close).unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get(Column::Close, Column::Volume).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(
            m.get(Column::Close, Column::DailyReturn),
            m.get(Column::DailyReturn, Column::Close)
        );
        // Zero-variance column has no defined correlation.
        assert_eq!(m.get(Column::Volatility, Column::Close), None);
    }
}
