//! Error types for portfolio_bench
//!
//! Each concern gets its own enum so callers can tell an "insufficient data"
//! outcome apart from a provider outage or a bad input.

use thiserror::Error;

/// Validation errors for position input.
///
/// These errors are shown directly to users and should be clear and actionable.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Symbol is required")]
    SymbolRequired,

    #[error("Company name is required")]
    CompanyNameRequired,

    #[error("Sector is required")]
    SectorRequired,

    #[error("Date is required")]
    DateRequired,

    #[error("Invalid date format: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Shares must be positive, got {0}")]
    NonPositiveShares(f64),

    #[error("Purchase price must be positive, got {0}")]
    NonPositivePrice(f64),
}

/// Failures of a single market-data request.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("No price data for {0}")]
    NotFound(String),

    #[error("Malformed response for {symbol}: {message}")]
    Malformed { symbol: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Yahoo(#[from] yahoo_finance_api::YahooError),
}

/// A caller cancelled the request before all fetches were issued.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("request was cancelled")]
pub struct Cancelled;

/// Failures of the performance calculation.
#[derive(Debug, Error)]
pub enum PerformanceError {
    #[error("Unknown time period '{0}' (expected one of 1W, 1M, 3M, YTD, 1Y, ALL)")]
    InvalidPeriod(String),

    #[error("Benchmark {symbol} unavailable: {source}")]
    BenchmarkUnavailable {
        symbol: String,
        #[source]
        source: SourceError,
    },

    #[error("Insufficient data: no benchmark price on or after {0}")]
    NoBenchmarkBaseline(chrono::NaiveDate),

    #[error("Insufficient data: no date with complete portfolio prices on or after {0}")]
    NoPortfolioBaseline(chrono::NaiveDate),

    #[error("Performance request was cancelled")]
    Cancelled,
}

impl PerformanceError {
    /// True for the outcomes a caller should present as "not enough data"
    /// rather than as a failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PerformanceError::NoBenchmarkBaseline(_) | PerformanceError::NoPortfolioBaseline(_)
        )
    }
}

impl From<Cancelled> for PerformanceError {
    fn from(_: Cancelled) -> Self {
        PerformanceError::Cancelled
    }
}

/// Failures of the local position store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Position {0} not found")]
    NotFound(u64),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Confy(#[from] confy::ConfyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_insufficient_data_classification() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert!(PerformanceError::NoBenchmarkBaseline(date).is_insufficient_data());
        assert!(PerformanceError::NoPortfolioBaseline(date).is_insufficient_data());
        assert!(!PerformanceError::Cancelled.is_insufficient_data());
        assert!(!PerformanceError::InvalidPeriod("2W".into()).is_insufficient_data());
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = PerformanceError::BenchmarkUnavailable {
            symbol: "SPY".into(),
            source: SourceError::NotFound("SPY".into()),
        };
        assert!(err.to_string().contains("SPY"));
        assert!(err.to_string().contains("unavailable"));

        let err = ValidationError::NonPositiveShares(-2.0);
        assert_eq!(err.to_string(), "Shares must be positive, got -2");
    }
}
