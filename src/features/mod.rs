//! Feature assembly: join indicator columns onto the gap-filled series.

pub mod gaps;

use crate::domain::{FeatureRow, FeatureTable, Series, WindowConfig};
use crate::error::AppError;
use crate::indicators::IndicatorSet;

/// Left-join indicator rows onto bars, preserving input order and date set.
///
/// The engine emits exactly one indicator row per bar, so the join is
/// positional; a length mismatch means the inputs came from different series.
pub fn assemble(
    series: &Series,
    indicators: &IndicatorSet,
    windows: WindowConfig,
) -> Result<FeatureTable, AppError> {
    if indicators.rows.len() != series.len() {
        return Err(AppError::internal(format!(
            "indicator rows ({}) do not match series rows ({})",
            indicators.rows.len(),
            series.len()
        )));
    }

    let rows = series
        .bars()
        .iter()
        .zip(&indicators.rows)
        .map(|(bar, ind)| FeatureRow {
            bar: bar.clone(),
            indicators: ind.clone(),
        })
        .collect();

    Ok(FeatureTable {
        symbol: series.symbol(),
        windows,
        rows,
    })
}
