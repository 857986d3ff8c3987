//! Derived valuation view over stored positions.
//!
//! Weights and totals are recomputed from the current prices on demand and never
//! written back to the store.

use crate::position::Position;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding<'a> {
    pub position: &'a Position,
    pub value: f64,
    /// Share of total portfolio value in percent.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioView<'a> {
    pub holdings: Vec<Holding<'a>>,
    pub total_value: f64,
}

impl<'a> PortfolioView<'a> {
    pub fn from_positions(positions: &'a [Position]) -> Self {
        let total_value: f64 = positions.iter().map(|p| p.current_value()).sum();
        let holdings = positions
            .iter()
            .map(|position| {
                let value = position.current_value();
                Holding {
                    position,
                    value,
                    weight: weight_of(value, total_value),
                }
            })
            .collect();
        Self {
            holdings,
            total_value,
        }
    }

    /// Percent of total value per sector.
    pub fn sector_allocation(&self) -> HashMap<String, f64> {
        let mut allocation: HashMap<String, f64> = HashMap::new();
        for holding in &self.holdings {
            *allocation
                .entry(holding.position.get_sector().to_string())
                .or_insert(0.0) += holding.weight;
        }
        allocation
    }

    /// Sector allocation in descending order %-wise.
    pub fn sorted_sector_allocation(&self) -> Vec<(String, f64)> {
        let mut allocation: Vec<(String, f64)> = self.sector_allocation().into_iter().collect();
        allocation.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        allocation
    }

    /// Value-weighted return since purchase over positions with a known price.
    pub fn total_return_percent(&self) -> Option<f64> {
        let (cost, value) = self
            .holdings
            .iter()
            .filter(|h| h.position.get_current_price().is_some())
            .fold((0.0, 0.0), |(cost, value), h| {
                (
                    cost + h.position.get_purchase_price() * h.position.get_shares(),
                    value + h.value,
                )
            });
        (cost > 0.0).then(|| (value - cost) / cost * 100.0)
    }
}

fn weight_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}
