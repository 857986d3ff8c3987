//! Local position store on top of sled.
//!
//! Positions live in the `positions` tree keyed by their big-endian id, so
//! iteration order is insertion order. The benchmark symbol is kept under the
//! `benchmark` key of the default tree.

use crate::error::StoreError;
use crate::position::{normalize_symbol, NewPosition, Position};
use std::collections::HashMap;
use std::path::Path;

const POSITIONS_TREE: &str = "positions";
const BENCHMARK_KEY: &str = "benchmark";

pub const DEFAULT_BENCHMARK: &str = "SPY";

pub struct PositionStore {
    db: sled::Db,
    positions: sled::Tree,
}

impl PositionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory store that disappears when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let positions = db.open_tree(POSITIONS_TREE)?;
        Ok(Self { db, positions })
    }

    /// All positions in the order they were added.
    pub fn list(&self) -> Result<Vec<Position>, StoreError> {
        self.positions
            .iter()
            .values()
            .map(|value| Ok(serde_json::from_slice(&value?)?))
            .collect()
    }

    pub fn get(&self, id: u64) -> Result<Position, StoreError> {
        match self.positions.get(id.to_be_bytes())? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Err(StoreError::NotFound(id)),
        }
    }

    pub fn add(&self, new: NewPosition) -> Result<Position, StoreError> {
        let valid = new.validate()?;
        let id = self.db.generate_id()?;
        let position = Position::from_new(id, valid);
        self.write(&position)?;
        tracing::debug!(id, symbol = position.get_symbol(), "position added");
        Ok(position)
    }

    pub fn remove(&self, id: u64) -> Result<Position, StoreError> {
        match self.positions.remove(id.to_be_bytes())? {
            Some(value) => {
                self.db.flush()?;
                Ok(serde_json::from_slice(&value)?)
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// Stores new current prices. Positions whose symbol is missing from
    /// `prices` keep their previous price. Returns how many were updated.
    pub fn update_prices(&self, prices: &HashMap<String, f64>) -> Result<usize, StoreError> {
        let mut updated = 0;
        for mut position in self.list()? {
            if let Some(price) = prices.get(position.get_symbol()) {
                position.update_price(*price);
                self.positions
                    .insert(position.get_id().to_be_bytes(), serde_json::to_vec(&position)?)?;
                updated += 1;
            }
        }
        self.db.flush()?;
        Ok(updated)
    }

    /// Removes every position. The benchmark setting is kept.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.positions.clear()?;
        self.db.flush()?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The benchmark chosen by the user, if any.
    pub fn stored_benchmark(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .db
            .get(BENCHMARK_KEY)?
            .map(|value| String::from_utf8_lossy(&value).to_string()))
    }

    pub fn benchmark(&self) -> Result<String, StoreError> {
        Ok(self
            .stored_benchmark()?
            .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()))
    }

    pub fn set_benchmark(&self, symbol: &str) -> Result<String, StoreError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(crate::error::ValidationError::SymbolRequired.into());
        }
        self.db.insert(BENCHMARK_KEY, symbol.as_bytes())?;
        self.db.flush()?;
        Ok(symbol)
    }

    /// Adds `positions` only when the store holds none. Returns whether it did.
    pub fn seed_if_empty(&self, positions: Vec<NewPosition>) -> Result<bool, StoreError> {
        if !self.is_empty() {
            return Ok(false);
        }
        for position in positions {
            self.add(position)?;
        }
        Ok(true)
    }

    fn write(&self, position: &Position) -> Result<(), StoreError> {
        self.positions
            .insert(position.get_id().to_be_bytes(), serde_json::to_vec(position)?)?;
        // block until all operations are stable on disk
        self.db.flush()?;
        Ok(())
    }
}
