//! Alpha Vantage REST client.
//!
//! Daily history comes from `TIME_SERIES_DAILY_ADJUSTED`, the latest price from
//! `GLOBAL_QUOTE`. Alpha Vantage reports most failures with HTTP 200 and an
//! `Error Message`, `Note` or `Information` field, so the body is always inspected.

use super::PriceSeriesSource;
use crate::error::SourceError;
use crate::position::DATE_FORMAT;
use crate::series::DailySeries;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Request timeout for Alpha Vantage calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much daily history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    /// The latest 100 trading days.
    #[default]
    Compact,
    /// Up to 20 years of history.
    Full,
}

impl OutputSize {
    fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyBar>>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

pub struct AlphaVantageSource {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    output_size: OutputSize,
}

impl AlphaVantageSource {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Client against a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: &str, api_key: String) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            output_size: OutputSize::default(),
        })
    }

    pub fn with_output_size(mut self, output_size: OutputSize) -> Self {
        self.output_size = output_size;
        self
    }

    async fn query(&self, symbol: &str, params: &[(&str, &str)]) -> Result<String, SourceError> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Provider {
                symbol: symbol.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(response.text().await?)
    }
}

fn check_provider_messages(
    symbol: &str,
    error_message: Option<String>,
    note: Option<String>,
    information: Option<String>,
) -> Result<(), SourceError> {
    if let Some(message) = error_message {
        return Err(SourceError::Provider {
            symbol: symbol.to_string(),
            message,
        });
    }
    // Both fields carry the call-frequency notice depending on plan and API version
    if let Some(message) = note.or(information) {
        return Err(SourceError::RateLimited(message));
    }
    Ok(())
}

fn parse_price(symbol: &str, raw: &str) -> Result<f64, SourceError> {
    raw.trim().parse::<f64>().map_err(|_| SourceError::Malformed {
        symbol: symbol.to_string(),
        message: format!("price '{raw}' is not a number"),
    })
}

fn parse_daily(symbol: &str, body: &str) -> Result<DailySeries, SourceError> {
    let response: DailyResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })?;
    check_provider_messages(
        symbol,
        response.error_message,
        response.note,
        response.information,
    )?;

    let bars = response.time_series.ok_or_else(|| SourceError::Malformed {
        symbol: symbol.to_string(),
        message: "missing 'Time Series (Daily)'".to_string(),
    })?;

    let mut series = DailySeries::new();
    for (date, bar) in bars {
        let date =
            NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|_| SourceError::Malformed {
                symbol: symbol.to_string(),
                message: format!("invalid date '{date}'"),
            })?;
        series.insert(date, parse_price(symbol, &bar.close)?);
    }

    if series.is_empty() {
        return Err(SourceError::NotFound(symbol.to_string()));
    }
    Ok(series)
}

fn parse_quote(symbol: &str, body: &str) -> Result<f64, SourceError> {
    let response: QuoteResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })?;
    check_provider_messages(
        symbol,
        response.error_message,
        response.note,
        response.information,
    )?;

    // Unknown symbols come back as an empty "Global Quote" object
    match response.global_quote.and_then(|q| q.price) {
        Some(raw) => parse_price(symbol, &raw),
        None => Err(SourceError::NotFound(symbol.to_string())),
    }
}

#[async_trait]
impl PriceSeriesSource for AlphaVantageSource {
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, SourceError> {
        let body = self
            .query(
                symbol,
                &[
                    ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                    ("outputsize", self.output_size.as_str()),
                ],
            )
            .await?;
        let series = parse_daily(symbol, &body)?;
        tracing::debug!(
            symbol,
            points = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            "fetched daily series"
        );
        Ok(series)
    }

    async fn fetch_current(&self, symbol: &str) -> Result<f64, SourceError> {
        let body = self
            .query(symbol, &[("function", "GLOBAL_QUOTE")])
            .await?;
        parse_quote(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn daily_json() -> serde_json::Value {
        serde_json::json!({
            "Meta Data": { "2. Symbol": "AAPL" },
            "Time Series (Daily)": {
                "2023-06-15": { "1. open": "186.7", "4. close": "190.0000", "5. adjusted close": "189.1" },
                "2023-06-01": { "1. open": "177.7", "4. close": "180.0000", "5. adjusted close": "179.2" }
            }
        })
    }

    #[tokio::test]
    async fn test_success_returns_sorted_closes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "TIME_SERIES_DAILY_ADJUSTED"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("outputsize", "compact"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(daily_json()))
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "test-key".to_string()).unwrap();
        let series = source.fetch_daily("AAPL").await.unwrap();

        let dates: Vec<_> = series.iter().collect();
        assert_eq!(
            dates,
            vec![
                (NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), 180.0),
                (NaiveDate::from_ymd_opt(2023, 6, 15).unwrap(), 190.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_full_output_size_is_requested() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("outputsize", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(daily_json()))
            .expect(1)
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "k".to_string())
            .unwrap()
            .with_output_size(OutputSize::Full);
        assert_eq!(source.fetch_daily("AAPL").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_message_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Error Message": "Invalid API call."
            })))
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "k".to_string()).unwrap();
        let err = source.fetch_daily("NOPE").await.unwrap_err();
        assert!(matches!(err, SourceError::Provider { ref message, .. } if message == "Invalid API call."));
    }

    #[tokio::test]
    async fn test_note_is_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
            })))
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "k".to_string()).unwrap();
        let err = source.fetch_current("AAPL").await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "k".to_string()).unwrap();
        let err = source.fetch_daily("AAPL").await.unwrap_err();
        assert!(matches!(err, SourceError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_global_quote_price() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", "MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Global Quote": { "01. symbol": "MSFT", "05. price": "331.2100" }
            })))
            .mount(&server)
            .await;

        let source = AlphaVantageSource::with_base_url(&server.uri(), "k".to_string()).unwrap();
        assert_eq!(source.fetch_current("MSFT").await.unwrap(), 331.21);
    }

    #[test]
    fn test_empty_global_quote_is_not_found() {
        let err = parse_quote("ZZZZ", r#"{"Global Quote": {}}"#).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(s) if s == "ZZZZ"));
    }

    #[test]
    fn test_missing_close_field_is_malformed() {
        let body = r#"{"Time Series (Daily)": {"2023-06-01": {"1. open": "1.0"}}}"#;
        assert!(matches!(
            parse_daily("AAPL", body),
            Err(SourceError::Malformed { .. })
        ));

        let body = r#"{"Meta Data": {}}"#;
        assert!(matches!(
            parse_daily("AAPL", body),
            Err(SourceError::Malformed { .. })
        ));
    }
}
