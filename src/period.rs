//! Time windows for the performance chart.

use crate::error::PerformanceError;
use crate::performance::Warning;
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl TimePeriod {
    /// Period used when a token cannot be parsed.
    pub const DEFAULT: TimePeriod = TimePeriod::OneMonth;

    pub fn all() -> &'static [TimePeriod] {
        &[
            TimePeriod::OneWeek,
            TimePeriod::OneMonth,
            TimePeriod::ThreeMonths,
            TimePeriod::YearToDate,
            TimePeriod::OneYear,
            TimePeriod::All,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::OneWeek => "1W",
            TimePeriod::OneMonth => "1M",
            TimePeriod::ThreeMonths => "3M",
            TimePeriod::YearToDate => "YTD",
            TimePeriod::OneYear => "1Y",
            TimePeriod::All => "ALL",
        }
    }

    /// Inclusive first date of the window ending at `today`.
    ///
    /// Month and year steps clamp to the end of the target month, so
    /// March 31 minus one month is the last day of February.
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            TimePeriod::OneWeek => today - Duration::days(7),
            TimePeriod::OneMonth => sub_months(today, 1),
            TimePeriod::ThreeMonths => sub_months(today, 3),
            TimePeriod::YearToDate => {
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(NaiveDate::MIN)
            }
            TimePeriod::OneYear => sub_months(today, 12),
            TimePeriod::All => NaiveDate::MIN,
        }
    }
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

impl FromStr for TimePeriod {
    type Err = PerformanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1W" => Ok(TimePeriod::OneWeek),
            "1M" => Ok(TimePeriod::OneMonth),
            "3M" => Ok(TimePeriod::ThreeMonths),
            "YTD" => Ok(TimePeriod::YearToDate),
            "1Y" => Ok(TimePeriod::OneYear),
            "ALL" => Ok(TimePeriod::All),
            _ => Err(PerformanceError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn resolve_period(token: &str) -> Result<TimePeriod, PerformanceError> {
    token.parse()
}

/// Like `resolve_period`, but falls back to one month and reports the fallback.
pub fn resolve_period_or_default(token: &str) -> (TimePeriod, Option<Warning>) {
    match resolve_period(token) {
        Ok(period) => (period, None),
        Err(_) => {
            tracing::warn!(
                token,
                fallback = %TimePeriod::DEFAULT,
                "unknown time period, using default"
            );
            (
                TimePeriod::DEFAULT,
                Some(Warning::InvalidPeriod {
                    token: token.to_string(),
                    fallback: TimePeriod::DEFAULT,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_start_dates() {
        let today = date(2024, 6, 15);
        assert_eq!(TimePeriod::OneWeek.start_date(today), date(2024, 6, 8));
        assert_eq!(TimePeriod::OneMonth.start_date(today), date(2024, 5, 15));
        assert_eq!(TimePeriod::ThreeMonths.start_date(today), date(2024, 3, 15));
        assert_eq!(TimePeriod::YearToDate.start_date(today), date(2024, 1, 1));
        assert_eq!(TimePeriod::OneYear.start_date(today), date(2023, 6, 15));
        assert_eq!(TimePeriod::All.start_date(today), NaiveDate::MIN);
    }

    #[test]
    fn test_month_end_clamps() {
        assert_eq!(
            TimePeriod::OneMonth.start_date(date(2024, 3, 31)),
            date(2024, 2, 29)
        );
        assert_eq!(
            TimePeriod::OneYear.start_date(date(2024, 2, 29)),
            date(2023, 2, 28)
        );
    }

    #[test]
    fn test_parse_tokens() {
        for period in TimePeriod::all() {
            assert_eq!(period.as_str().parse::<TimePeriod>().unwrap(), *period);
        }
        assert_eq!("ytd".parse::<TimePeriod>().unwrap(), TimePeriod::YearToDate);
        assert!(matches!(
            "2W".parse::<TimePeriod>(),
            Err(PerformanceError::InvalidPeriod(t)) if t == "2W"
        ));
    }

    #[test]
    fn test_unknown_token_falls_back_with_warning() {
        let (period, warning) = resolve_period_or_default("5D");
        assert_eq!(period, TimePeriod::OneMonth);
        assert_eq!(
            warning,
            Some(Warning::InvalidPeriod {
                token: "5D".to_string(),
                fallback: TimePeriod::OneMonth,
            })
        );

        let (period, warning) = resolve_period_or_default("3M");
        assert_eq!(period, TimePeriod::ThreeMonths);
        assert!(warning.is_none());
    }
}
