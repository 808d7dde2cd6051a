//! Offline market data from a CSV file.
//!
//! Expected header (case-insensitive, any column order):
//! `date,open,high,low,close,volume`. Only `date` and `close` are required;
//! blank cells are missing values. Rows outside the requested range are skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::StringRecord;

use super::{MarketDataSource, parse_cell};
use crate::domain::{Bar, Series, Symbol};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarketDataSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: Symbol, start: NaiveDate, end: NaiveDate) -> Result<Series, AppError> {
        let file = File::open(&self.path).map_err(|e| {
            AppError::unavailable(format!("failed to open CSV '{}': {e}", self.path.display()))
        })?;
        tracing::info!(path = %self.path.display(), %symbol, "reading bars from CSV");
        read_bars(file, symbol, start, end)
    }
}

/// Parse bars from any CSV reader, keeping rows dated within `start..=end`.
pub fn read_bars<R: Read>(reader: R, symbol: Symbol, start: NaiveDate, end: NaiveDate) -> Result<Series, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::unavailable(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in ["date", "close"] {
        if !header_map.contains_key(required) {
            return Err(AppError::unavailable(format!("missing required CSV column: `{required}`")));
        }
    }

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unreadable CSV row");
                skipped += 1;
                continue;
            }
        };

        let Some(date) = get(&record, &header_map, "date").and_then(parse_date) else {
            tracing::warn!(line, "skipping CSV row with an invalid date");
            skipped += 1;
            continue;
        };
        if date < start || date > end {
            continue;
        }

        let cell = |name: &str| get(&record, &header_map, name).and_then(parse_cell);
        bars.push(Bar {
            date,
            open: cell("open"),
            high: cell("high"),
            low: cell("low"),
            close: cell("close"),
            volume: cell("volume"),
        });
    }

    if bars.is_empty() {
        return Err(AppError::unavailable(format!(
            "no CSV rows for {symbol} between {start} and {end}"
        )));
    }
    if skipped > 0 {
        tracing::warn!(skipped, "some CSV rows could not be parsed");
    }

    bars.sort_by_key(|b| b.date);
    Series::new(symbol, bars)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    header_map.get(name).and_then(|&idx| record.get(idx))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
