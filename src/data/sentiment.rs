//! Social-sentiment lookup.
//!
//! The sentiment panel is optional: any failure here is reported to the caller as
//! an `ExternalService` error and the pipeline carries on without a score.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::Symbol;
use crate::error::AppError;

const SERVICE: &str = "sentiment";

pub trait SentimentSource {
    /// Current sentiment for `symbol`, in `[-1, 1]`.
    fn fetch_sentiment(&self, symbol: Symbol) -> Result<f64, AppError>;
}

/// A source with no endpoint configured; always fails softly.
#[derive(Debug, Clone, Default)]
pub struct NoSentiment;

impl SentimentSource for NoSentiment {
    fn fetch_sentiment(&self, _: Symbol) -> Result<f64, AppError> {
        Err(AppError::external(SERVICE, "COIN_DASH_SENTIMENT_URL is not set"))
    }
}

/// `GET {url}?symbol=BTC` returning `{"score": <f64>}`.
pub struct HttpSentimentClient {
    client: Client,
    url: String,
}

impl HttpSentimentClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::external(SERVICE, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("COIN_DASH_SENTIMENT_URL")
            .map_err(|_| AppError::external(SERVICE, "COIN_DASH_SENTIMENT_URL is not set"))?;
        Self::new(url)
    }
}

impl SentimentSource for HttpSentimentClient {
    fn fetch_sentiment(&self, symbol: Symbol) -> Result<f64, AppError> {
        tracing::debug!(%symbol, url = %self.url, "fetching sentiment");
        let resp = self
            .client
            .get(&self.url)
            .query(&[("symbol", symbol.code())])
            .send()
            .map_err(|e| AppError::external(SERVICE, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::external(
                SERVICE,
                format!("request failed with status {}", resp.status()),
            ));
        }

        let body: SentimentResponse = resp
            .json()
            .map_err(|e| AppError::external(SERVICE, format!("failed to parse response: {e}")))?;
        checked_score(body.score)
    }
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    score: f64,
}

fn checked_score(score: f64) -> Result<f64, AppError> {
    if score.is_finite() && (-1.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(AppError::external(SERVICE, format!("score {score} is outside [-1, 1]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_range_is_enforced() {
        assert_eq!(checked_score(0.25).unwrap(), 0.25);
        assert_eq!(checked_score(-1.0).unwrap(), -1.0);
        assert!(checked_score(1.5).is_err());
        assert!(checked_score(f64::NAN).is_err());
    }

    #[test]
    fn response_body_parses() {
        let body: SentimentResponse = serde_json::from_str(r#"{"score": -0.4, "source": "x"}"#).unwrap();
        assert_eq!(body.score, -0.4);
    }

    #[test]
    fn unconfigured_source_is_a_soft_failure() {
        let err = NoSentiment.fetch_sentiment(Symbol::Btc).unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }));
        assert!(!err.is_fatal());
    }
}
