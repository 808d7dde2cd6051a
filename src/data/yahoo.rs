//! Yahoo Finance chart API client (daily bars, USD quoted).

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::MarketDataSource;
use crate::domain::{Bar, Series, Symbol};
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "coin-dash/0.1";

pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(|e| AppError::unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Uses `COIN_DASH_YAHOO_URL` when set (`.env` supported), else the public endpoint.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base = std::env::var("COIN_DASH_YAHOO_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }
}

impl MarketDataSource for YahooClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(&self, symbol: Symbol, start: NaiveDate, end: NaiveDate) -> Result<Series, AppError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol.usd_ticker());

        tracing::info!(%symbol, %start, %end, "fetching daily bars");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .map_err(|e| AppError::unavailable(format!("Yahoo request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::unavailable(format!(
                "Yahoo request for {} failed with status {}",
                symbol.usd_ticker(),
                resp.status()
            )));
        }

        let body: ChartResponse = resp
            .json()
            .map_err(|e| AppError::unavailable(format!("failed to parse Yahoo response: {e}")))?;

        let series = parse_chart(symbol, body)?;
        tracing::debug!(%symbol, bars = series.len(), "parsed chart response");
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart(symbol: Symbol, body: ChartResponse) -> Result<Series, AppError> {
    if let Some(err) = body.chart.error {
        return Err(AppError::unavailable(format!(
            "Yahoo returned {} for {}: {}",
            err.code,
            symbol.usd_ticker(),
            err.description
        )));
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AppError::unavailable(format!("no chart data for {}", symbol.usd_ticker())))?;

    if result.timestamp.is_empty() {
        return Err(AppError::unavailable(format!(
            "empty price history for {}",
            symbol.usd_ticker()
        )));
    }

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let cell = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten().filter(|v| v.is_finite());

    let mut bars: Vec<Bar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AppError::unavailable(format!("invalid Yahoo timestamp {ts}")))?
            .date_naive();
        let bar = Bar {
            date,
            open: cell(&quote.open, i),
            high: cell(&quote.high, i),
            low: cell(&quote.low, i),
            close: cell(&quote.close, i),
            volume: cell(&quote.volume, i),
        };
        // The live session can repeat the last trading day; keep the latest quote.
        match bars.last_mut() {
            Some(last) if last.date == date => *last = bar,
            _ => bars.push(bar),
        }
    }

    Series::new(symbol, bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Series, AppError> {
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart(Symbol::Btc, body)
    }

    #[test]
    fn parses_bars_with_null_cells() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1735689600,1735776000],
            "indicators":{"quote":[{
                "open":[93000.0,null],"high":[95000.0,null],"low":[92000.0,null],
                "close":[94000.0,null],"volume":[1.5e10,null]
            }]}
        }],"error":null}}"#;
        let series = parse(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(series.bars()[0].close, Some(94000.0));
        assert_eq!(series.bars()[1].close, None);
        assert_eq!(series.bars()[1].volume, None);
    }

    #[test]
    fn repeated_day_keeps_latest_quote() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1735689600,1735700000],
            "indicators":{"quote":[{"close":[1.0,2.0]}]}
        }],"error":null}}"#;
        let series = parse(json).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, Some(2.0));
    }

    #[test]
    fn empty_result_is_unavailable() {
        let json = r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(parse(json), Err(AppError::DataUnavailable(_))));
    }

    #[test]
    fn api_error_is_unavailable() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }
}
