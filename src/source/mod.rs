//! Market-data providers.
//!
//! The performance engine and the price refresh only see the
//! [`PriceSeriesSource`] trait; which provider backs it is a configuration choice.

mod alpha_vantage;
mod memory;
mod yahoo;

pub use alpha_vantage::{AlphaVantageSource, OutputSize};
pub use memory::MemorySource;
pub use yahoo::YahooSource;

use crate::error::SourceError;
use crate::series::DailySeries;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait PriceSeriesSource: Send + Sync {
    /// Daily closing prices for `symbol`.
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, SourceError>;

    /// Latest traded price for `symbol`.
    async fn fetch_current(&self, symbol: &str) -> Result<f64, SourceError>;
}

#[async_trait]
impl<T: PriceSeriesSource + ?Sized> PriceSeriesSource for Box<T> {
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, SourceError> {
        (**self).fetch_daily(symbol).await
    }

    async fn fetch_current(&self, symbol: &str) -> Result<f64, SourceError> {
        (**self).fetch_current(symbol).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    AlphaVantage,
    Yahoo,
}

/// Builds the configured provider.
pub fn build_source(
    provider: Provider,
    api_key: Option<&str>,
    output_size: OutputSize,
) -> Result<Box<dyn PriceSeriesSource>, SourceError> {
    match provider {
        Provider::AlphaVantage => {
            let api_key = api_key.unwrap_or("demo");
            if api_key == "demo" {
                tracing::warn!("no Alpha Vantage API key configured, using the demo key");
            }
            Ok(Box::new(
                AlphaVantageSource::new(api_key.to_string())?.with_output_size(output_size),
            ))
        }
        Provider::Yahoo => {
            // same coverage as Alpha Vantage: about 100 trading days or 20 years
            let days = match output_size {
                OutputSize::Compact => 150,
                OutputSize::Full => 20 * 366,
            };
            Ok(Box::new(YahooSource::new()?.with_lookback_days(days)))
        }
    }
}
