//! Current-price refresh for stored positions.

use crate::error::{Cancelled, SourceError};
use crate::position::{normalize_symbol, Position};
use crate::source::PriceSeriesSource;
use crate::throttle::{fetch_paced, FetchPolicy};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Outcome of one refresh pass.
///
/// A symbol in `failures` keeps whatever price it had before; callers can show
/// that distinctly from an unchanged price.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub prices: HashMap<String, f64>,
    pub failures: Vec<(String, SourceError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Distinct symbols of `positions`, first-seen order.
pub fn position_symbols(positions: &[Position]) -> Vec<String> {
    let mut seen = HashSet::new();
    positions
        .iter()
        .map(|p| normalize_symbol(p.get_symbol()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

pub async fn refresh_prices<S: PriceSeriesSource + ?Sized>(
    source: &S,
    symbols: Vec<String>,
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Result<RefreshReport, Cancelled> {
    let pacer = policy.pacer();
    let fetched = fetch_paced(&pacer, policy.max_concurrent, symbols, cancel, |symbol| async move {
        source.fetch_current(&symbol).await
    })
    .await?;

    let mut report = RefreshReport::default();
    for (symbol, result) in fetched {
        match result {
            Ok(price) => {
                report.prices.insert(symbol, price);
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "price refresh failed, keeping previous price");
                report.failures.push((symbol, e));
            }
        }
    }
    Ok(report)
}
