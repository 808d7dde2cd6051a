//! Export the feature table (with anomaly labels) to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one row per day, blank cells for undefined values.

use std::io::Write;
use std::path::Path;

use crate::anomaly::AnomalyLabels;
use crate::domain::FeatureTable;
use crate::error::AppError;

pub const EXPORT_HEADER: [&str; 12] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "sma_short",
    "sma_long",
    "daily_return",
    "volatility",
    "rsi",
    "anomaly",
];

/// Write the feature table to a CSV file.
pub fn write_table_csv(path: &Path, table: &FeatureTable, labels: Option<&AnomalyLabels>) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::io(format!("failed to create export CSV '{}': {e}", path.display())))?;
    write_table(file, table, labels)?;
    tracing::info!(path = %path.display(), rows = table.len(), "wrote feature table CSV");
    Ok(())
}

/// Write the feature table as CSV to any writer.
pub fn write_table<W: Write>(writer: W, table: &FeatureTable, labels: Option<&AnomalyLabels>) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_HEADER)
        .map_err(|e| AppError::io(format!("failed to write export CSV header: {e}")))?;

    for (i, row) in table.rows.iter().enumerate() {
        let b = &row.bar;
        let ind = &row.indicators;
        let label = labels
            .and_then(|l| l.labels.get(i).copied().flatten())
            .map(|l| l.as_str().to_string())
            .unwrap_or_default();
        out.write_record([
            b.date.to_string(),
            cell(b.open),
            cell(b.high),
            cell(b.low),
            cell(b.close),
            cell(b.volume),
            cell(ind.sma_short),
            cell(ind.sma_long),
            cell(ind.daily_return),
            cell(ind.volatility),
            cell(ind.rsi),
            label,
        ])
        .map_err(|e| AppError::io(format!("failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::io(format!("failed to flush export CSV: {e}")))?;
    Ok(())
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.10}")).unwrap_or_default()
}
