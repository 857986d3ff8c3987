use super::PriceSeriesSource;
use crate::error::SourceError;
use crate::series::DailySeries;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves prices from memory and records every request.
///
/// Symbols without data answer with `SourceError::NotFound`.
#[derive(Debug, Default)]
pub struct MemorySource {
    series: HashMap<String, DailySeries>,
    current: HashMap<String, f64>,
    requests: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, series: DailySeries) -> Self {
        self.series.insert(symbol.to_string(), series);
        self
    }

    pub fn with_current(mut self, symbol: &str, price: f64) -> Self {
        self.current.insert(symbol.to_string(), price);
        self
    }

    /// Symbols requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, symbol: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(symbol.to_string());
        }
    }
}

#[async_trait]
impl PriceSeriesSource for MemorySource {
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, SourceError> {
        self.record(symbol);
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))
    }

    async fn fetch_current(&self, symbol: &str) -> Result<f64, SourceError> {
        self.record(symbol);
        self.current
            .get(symbol)
            .copied()
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))
    }
}
