use super::PriceSeriesSource;
use crate::error::SourceError;
use crate::series::DailySeries;
use async_trait::async_trait;
use chrono::NaiveDate;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

/// Default daily history window, about one year.
const DEFAULT_LOOKBACK_DAYS: i64 = 366;

pub struct YahooSource {
    connector: yahoo::YahooConnector,
    lookback_days: i64,
}

impl YahooSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            connector: yahoo::YahooConnector::new()?,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        })
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }
}

// Yahoo stamps daily bars with the session open, which is on the trading day in UTC
fn quote_date(timestamp: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

#[async_trait]
impl PriceSeriesSource for YahooSource {
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, SourceError> {
        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(self.lookback_days);

        let response = self.connector.get_quote_history(symbol, start, end).await?;
        let series: DailySeries = response
            .quotes()?
            .into_iter()
            .filter_map(|q| quote_date(q.timestamp as i64).map(|date| (date, q.close)))
            .collect();

        if series.is_empty() {
            return Err(SourceError::NotFound(symbol.to_string()));
        }
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
        let response = self.connector.get_latest_quotes(symbol, "1d").await?;
        Ok(response.last_quote()?.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_date_uses_utc_day() {
        // 2024-06-14 13:30:00 UTC, the NYSE open
        assert_eq!(
            quote_date(1718371800),
            NaiveDate::from_ymd_opt(2024, 6, 14)
        );
        assert_eq!(quote_date(0), NaiveDate::from_ymd_opt(1970, 1, 1));
    }
}
