//! Date-indexed closing price series.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Closing prices of one symbol keyed by calendar date.
///
/// Iteration is always in ascending date order and a date appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    closes: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    pub fn new() -> DailySeries {
        DailySeries {
            closes: BTreeMap::new(),
        }
    }

    /// Inserts a close, ignoring prices that are not positive and finite.
    /// Returns whether the price was kept.
    pub fn insert(&mut self, date: NaiveDate, close: f64) -> bool {
        if close.is_finite() && close > 0.0 {
            self.closes.insert(date, close);
            true
        } else {
            tracing::debug!(%date, close, "dropping invalid close price");
            false
        }
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.closes.get(&date).copied()
    }

    /// Dates on or after `cutoff`, ascending.
    pub fn dates_from(&self, cutoff: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        self.closes.range(cutoff..).map(|(date, _)| *date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.closes.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.closes.keys().next_back().copied()
    }

    /// Most recent close.
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.closes.iter().next_back().map(|(d, p)| (*d, *p))
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.closes.iter().map(|(d, p)| (*d, *p))
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        let mut series = DailySeries::new();
        for (date, close) in iter {
            series.insert(date, close);
        }
        series
    }
}

/// The date axis of a performance run: benchmark dates on or after `cutoff`.
///
/// Dates that only appear in position series are never part of the axis.
pub fn date_axis(benchmark: &DailySeries, cutoff: NaiveDate) -> Vec<NaiveDate> {
    benchmark.dates_from(cutoff).collect()
}
