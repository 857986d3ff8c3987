//! Portfolio versus benchmark performance.
//!
//! The benchmark series drives the date axis. Portfolio and benchmark each get
//! their own baseline because positions may be bought after the window starts,
//! so portfolio history can legitimately begin later than the benchmark's.

use crate::error::PerformanceError;
use crate::period::{resolve_period_or_default, TimePeriod};
use crate::position::{normalize_symbol, Position};
use crate::series::{date_axis, DailySeries};
use crate::source::PriceSeriesSource;
use crate::throttle::{fetch_paced, FetchPolicy};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Price histories of one run, keyed by upper-case symbol.
pub type SeriesBySymbol = HashMap<String, DailySeries>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPoint {
    pub date: NaiveDate,
    /// Change from the series baseline, in percent.
    pub percent_change: f64,
}

/// Reference point a series is normalized against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub date: NaiveDate,
    pub value: f64,
}

/// Conditions a caller may want to show but that did not stop the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    InvalidPeriod { token: String, fallback: TimePeriod },
    SymbolUnavailable { symbol: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResult {
    pub period: TimePeriod,
    pub cutoff: NaiveDate,
    pub portfolio: Vec<ReturnPoint>,
    pub benchmark: Vec<ReturnPoint>,
    pub warnings: Vec<Warning>,
}

impl PerformanceResult {
    /// Last portfolio return of the window.
    pub fn portfolio_return(&self) -> Option<f64> {
        self.portfolio.last().map(|p| p.percent_change)
    }

    /// Last benchmark return of the window.
    pub fn benchmark_return(&self) -> Option<f64> {
        self.benchmark.last().map(|p| p.percent_change)
    }

    /// Portfolio return minus benchmark return, in percentage points.
    pub fn excess_return(&self) -> Option<f64> {
        Some(self.portfolio_return()? - self.benchmark_return()?)
    }
}

pub fn percent_change(value: f64, baseline: f64) -> f64 {
    (value / baseline - 1.0) * 100.0
}

fn owned_on(positions: &[Position], date: NaiveDate) -> impl Iterator<Item = &Position> {
    positions.iter().filter(move |p| p.is_owned_on(date))
}

/// Value of the positions owned on `date` that have a price that day.
///
/// Positions without a price simply do not contribute.
pub fn portfolio_value_on(positions: &[Position], series: &SeriesBySymbol, date: NaiveDate) -> f64 {
    owned_on(positions, date)
        .filter_map(|p| {
            let price = series.get(p.get_symbol())?.price_on(date)?;
            Some(price * p.get_shares())
        })
        .sum()
}

// Value of the owned positions, or None when any fetched symbol lacks a price
// on `date`. Completeness covers every position, bought yet or not; symbols
// whose fetch failed are absent from `series` and take no part.
fn complete_value_on(positions: &[Position], series: &SeriesBySymbol, date: NaiveDate) -> Option<f64> {
    positions
        .iter()
        .filter_map(|p| series.get(p.get_symbol()).map(|s| (p, s)))
        .map(|(p, s)| {
            let price = s.price_on(date)?;
            Some(if p.is_owned_on(date) { price * p.get_shares() } else { 0.0 })
        })
        .sum()
}

/// First axis date with a benchmark price.
pub fn benchmark_baseline(
    axis: &[NaiveDate],
    benchmark: &DailySeries,
    cutoff: NaiveDate,
) -> Result<Baseline, PerformanceError> {
    axis.iter()
        .find_map(|&date| benchmark.price_on(date).map(|value| Baseline { date, value }))
        .ok_or(PerformanceError::NoBenchmarkBaseline(cutoff))
}

/// First axis date where every fetched position has a price and the owned
/// total is positive.
pub fn portfolio_baseline(
    axis: &[NaiveDate],
    positions: &[Position],
    series: &SeriesBySymbol,
    cutoff: NaiveDate,
) -> Result<Baseline, PerformanceError> {
    axis.iter()
        .find_map(|&date| {
            complete_value_on(positions, series, date)
                .filter(|value| *value > 0.0)
                .map(|value| Baseline { date, value })
        })
        .ok_or(PerformanceError::NoPortfolioBaseline(cutoff))
}

/// Computes the portfolio and benchmark return series from resolved price data.
///
/// Returns `(portfolio, benchmark)`. Pure: identical inputs give identical output.
pub fn compute_returns(
    positions: &[Position],
    benchmark: &DailySeries,
    series: &SeriesBySymbol,
    cutoff: NaiveDate,
) -> Result<(Vec<ReturnPoint>, Vec<ReturnPoint>), PerformanceError> {
    let axis = date_axis(benchmark, cutoff);

    let benchmark_base = benchmark_baseline(&axis, benchmark, cutoff)?;
    let portfolio_base = portfolio_baseline(&axis, positions, series, cutoff)?;
    tracing::debug!(
        benchmark_baseline = %benchmark_base.date,
        portfolio_baseline = %portfolio_base.date,
        axis_len = axis.len(),
        "baselines selected"
    );

    let benchmark_points = axis
        .iter()
        .filter(|date| **date >= benchmark_base.date)
        .filter_map(|&date| {
            benchmark.price_on(date).map(|price| ReturnPoint {
                date,
                percent_change: percent_change(price, benchmark_base.value),
            })
        })
        .collect();

    // Prices are positive, so a non-positive sum means no position had data
    let portfolio_points = axis
        .iter()
        .filter(|date| **date >= portfolio_base.date)
        .filter_map(|&date| {
            let value = portfolio_value_on(positions, series, date);
            (value > 0.0).then(|| ReturnPoint {
                date,
                percent_change: percent_change(value, portfolio_base.value),
            })
        })
        .collect();

    Ok((portfolio_points, benchmark_points))
}

/// Distinct position symbols in first-seen order, without the benchmark.
fn distinct_symbols(positions: &[Position], benchmark_symbol: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(benchmark_symbol.to_string());
    positions
        .iter()
        .map(|p| p.get_symbol().to_string())
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Fetches price histories and computes performance for a position snapshot.
///
/// Each call is independent. A caller that issues a newer request should
/// cancel the older one's token and discard its result.
pub struct PerformanceEngine<S> {
    source: S,
    policy: FetchPolicy,
}

impl<S: PriceSeriesSource> PerformanceEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            policy: FetchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn compute_performance(
        &self,
        positions: &[Position],
        benchmark_symbol: &str,
        period: &str,
        cancel: &CancellationToken,
    ) -> Result<PerformanceResult, PerformanceError> {
        let today = chrono::Local::now().date_naive();
        self.compute_performance_at(positions, benchmark_symbol, period, today, cancel)
            .await
    }

    /// Same as `compute_performance`, with the window ending at `today`.
    pub async fn compute_performance_at(
        &self,
        positions: &[Position],
        benchmark_symbol: &str,
        period: &str,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<PerformanceResult, PerformanceError> {
        let (period, warning) = resolve_period_or_default(period);
        let cutoff = period.start_date(today);
        let mut warnings: Vec<Warning> = warning.into_iter().collect();

        let benchmark_symbol = normalize_symbol(benchmark_symbol);
        let pacer = self.policy.pacer();

        pacer.acquire(cancel).await?;
        let benchmark = self
            .source
            .fetch_daily(&benchmark_symbol)
            .await
            .map_err(|source| {
                tracing::warn!(symbol = %benchmark_symbol, error = %source, "benchmark fetch failed");
                PerformanceError::BenchmarkUnavailable {
                    symbol: benchmark_symbol.clone(),
                    source,
                }
            })?;

        let symbols = distinct_symbols(positions, &benchmark_symbol);
        let fetched = fetch_paced(
            &pacer,
            self.policy.max_concurrent,
            symbols,
            cancel,
            |symbol| async move { self.source.fetch_daily(&symbol).await },
        )
        .await?;

        let mut series = SeriesBySymbol::new();
        for (symbol, result) in fetched {
            match result {
                Ok(s) => {
                    series.insert(symbol, s);
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "price history unavailable, excluding symbol");
                    warnings.push(Warning::SymbolUnavailable {
                        symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }
        // a position may hold the benchmark itself
        series.insert(benchmark_symbol.clone(), benchmark);
        let benchmark = &series[&benchmark_symbol];

        let (portfolio, benchmark) = compute_returns(positions, benchmark, &series, cutoff)?;

        Ok(PerformanceResult {
            period,
            cutoff,
            portfolio,
            benchmark,
            warnings,
        })
    }
}
