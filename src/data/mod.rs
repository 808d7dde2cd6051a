//! Market-data and sentiment collaborators.
//!
//! The pipeline only sees the two traits below; each concrete source lives in its
//! own module.

pub mod csv_source;
pub mod sample;
pub mod sentiment;
pub mod yahoo;

use chrono::NaiveDate;

pub use csv_source::CsvSource;
pub use sample::SyntheticSource;
pub use sentiment::{HttpSentimentClient, NoSentiment, SentimentSource};
pub use yahoo::YahooClient;

use crate::domain::{Series, Symbol};
use crate::error::AppError;

/// Daily OHLCV history for one symbol over an inclusive date range.
pub trait MarketDataSource {
    fn name(&self) -> &str;

    /// Fetch bars for `start..=end`. An empty result is a `DataUnavailable` error.
    fn fetch(&self, symbol: Symbol, start: NaiveDate, end: NaiveDate) -> Result<Series, AppError>;
}

/// Parse a numeric cell, treating blanks and non-finite values as missing.
pub(crate) fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_nan_cells_are_missing() {
        assert_eq!(parse_cell(" 12.5 "), Some(12.5));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("null"), None);
        assert_eq!(parse_cell("abc"), None);
    }
}
