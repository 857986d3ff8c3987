use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for purchase dates and price series keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One holding as stored in the position store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    id: u64,
    symbol: String,
    company_name: String,
    shares: f64,
    purchase_price: f64,
    purchase_date: NaiveDate,
    sector: String,

    #[serde(default)]
    current_price: Option<f64>,
}

impl Position {
    pub(crate) fn from_new(id: u64, new: ValidPosition) -> Position {
        Position {
            id,
            symbol: new.symbol,
            company_name: new.company_name,
            shares: new.shares,
            purchase_price: new.purchase_price,
            purchase_date: new.purchase_date,
            sector: new.sector,
            current_price: None,
        }
    }

    pub(crate) fn update_price(&mut self, current_price: f64) {
        self.current_price = Some(current_price);
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_symbol(&self) -> &str {
        &self.symbol
    }

    pub fn get_company_name(&self) -> &str {
        &self.company_name
    }

    pub fn get_sector(&self) -> &str {
        &self.sector
    }

    pub fn get_shares(&self) -> f64 {
        self.shares
    }

    pub fn get_purchase_price(&self) -> f64 {
        self.purchase_price
    }

    pub fn get_purchase_date(&self) -> NaiveDate {
        self.purchase_date
    }

    pub fn get_current_price(&self) -> Option<f64> {
        self.current_price
    }

    /// A position counts towards portfolio value from its purchase date on.
    pub fn is_owned_on(&self, date: NaiveDate) -> bool {
        self.purchase_date <= date
    }

    /// Market value at the last refreshed price, 0 until a price is known.
    pub fn current_value(&self) -> f64 {
        self.current_price.unwrap_or(0.0) * self.shares
    }

    /// Return since purchase in percent, if a current price is known.
    pub fn total_return_percent(&self) -> Option<f64> {
        let price = self.current_price?;
        Some((price - self.purchase_price) / self.purchase_price * 100.0)
    }
}

/// Raw position input, as typed by a user.
#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub symbol: String,
    pub company_name: String,
    pub shares: f64,
    pub purchase_price: f64,
    pub purchase_date: String,
    pub sector: String,
}

/// Position input that passed validation; only the store turns it into a `Position`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPosition {
    symbol: String,
    company_name: String,
    shares: f64,
    purchase_price: f64,
    purchase_date: NaiveDate,
    sector: String,
}

impl NewPosition {
    pub fn validate(self) -> Result<ValidPosition, ValidationError> {
        let symbol = normalize_symbol(&self.symbol);
        if symbol.is_empty() {
            return Err(ValidationError::SymbolRequired);
        }
        let company_name = self.company_name.trim().to_string();
        if company_name.is_empty() {
            return Err(ValidationError::CompanyNameRequired);
        }
        let sector = self.sector.trim().to_string();
        if sector.is_empty() {
            return Err(ValidationError::SectorRequired);
        }
        // NaN fails both comparisons and is rejected as well
        if !(self.shares > 0.0 && self.shares.is_finite()) {
            return Err(ValidationError::NonPositiveShares(self.shares));
        }
        if !(self.purchase_price > 0.0 && self.purchase_price.is_finite()) {
            return Err(ValidationError::NonPositivePrice(self.purchase_price));
        }
        let purchase_date = parse_date(&self.purchase_date)?;

        Ok(ValidPosition {
            symbol,
            company_name,
            shares: self.shares,
            purchase_price: self.purchase_price,
            purchase_date,
            sector,
        })
    }
}

/// Symbols are compared and fetched in upper case.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValidationError::DateRequired);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

#[cfg(test)]
pub(crate) fn test_position(id: u64, symbol: &str, shares: f64, purchase_date: &str) -> Position {
    test_position_in(id, symbol, shares, purchase_date, "Technology")
}

#[cfg(test)]
pub(crate) fn test_position_in(
    id: u64,
    symbol: &str,
    shares: f64,
    purchase_date: &str,
    sector: &str,
) -> Position {
    let valid = NewPosition {
        symbol: symbol.to_string(),
        company_name: format!("{symbol} Inc."),
        shares,
        purchase_price: 100.0,
        purchase_date: purchase_date.to_string(),
        sector: sector.to_string(),
    }
    .validate()
    .unwrap();
    Position::from_new(id, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewPosition {
        NewPosition {
            symbol: " aapl ".to_string(),
            company_name: "Apple Inc.".to_string(),
            shares: 10.0,
            purchase_price: 175.25,
            purchase_date: "2023-01-15".to_string(),
            sector: "Technology".to_string(),
        }
    }

    #[test]
    fn test_validate_uppercases_symbol() {
        let valid = input().validate().unwrap();
        let position = Position::from_new(1, valid);
        assert_eq!(position.get_symbol(), "AAPL");
        assert_eq!(
            position.get_purchase_date(),
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(position.get_current_price(), None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut bad = input();
        bad.symbol = "  ".to_string();
        assert_eq!(bad.validate(), Err(ValidationError::SymbolRequired));

        let mut bad = input();
        bad.shares = 0.0;
        assert_eq!(bad.validate(), Err(ValidationError::NonPositiveShares(0.0)));

        let mut bad = input();
        bad.purchase_price = -1.0;
        assert_eq!(bad.validate(), Err(ValidationError::NonPositivePrice(-1.0)));

        let mut bad = input();
        bad.purchase_date = "15/01/2023".to_string();
        assert_eq!(
            bad.validate(),
            Err(ValidationError::InvalidDate("15/01/2023".to_string()))
        );

        let mut bad = input();
        bad.purchase_date = String::new();
        assert_eq!(bad.validate(), Err(ValidationError::DateRequired));

        let mut bad = input();
        bad.sector = String::new();
        assert_eq!(bad.validate(), Err(ValidationError::SectorRequired));
    }

    #[test]
    fn test_derived_values() {
        let mut position = Position::from_new(7, input().validate().unwrap());
        assert_eq!(position.current_value(), 0.0);
        assert_eq!(position.total_return_percent(), None);

        position.update_price(200.0);
        assert_eq!(position.current_value(), 2000.0);
        let ret = position.total_return_percent().unwrap();
        assert!((ret - 14.122).abs() < 0.01);
    }

    #[test]
    fn test_owned_on_purchase_date() {
        let position = test_position(1, "MSFT", 5.0, "2023-02-10");
        assert!(position.is_owned_on(NaiveDate::from_ymd_opt(2023, 2, 10).unwrap()));
        assert!(!position.is_owned_on(NaiveDate::from_ymd_opt(2023, 2, 9).unwrap()));
    }
}
