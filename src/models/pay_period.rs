//! Pay period model.
//!
//! Requests identify their period with a short string. This module turns that
//! identifier into a concrete, inclusive date range so callers can select the
//! transactions belonging to it.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// An inclusive date range that transactions are grouped by.
///
/// Two identifier forms are accepted:
/// - `YYYY-MM`, the whole calendar month
/// - `YYYY-MM-DD..YYYY-MM-DD`, an explicit inclusive range
///
/// # Example
///
/// ```
/// use compensation_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period: PayPeriod = "2026-02".parse().unwrap();
/// assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
/// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
}

impl PayPeriod {
    /// Parses a period identifier.
    pub fn parse(identifier: &str) -> EngineResult<Self> {
        let identifier = identifier.trim();
        let invalid = |message: &str| EngineError::InvalidPeriod {
            period: identifier.to_string(),
            message: message.to_string(),
        };

        if let Some((start, end)) = identifier.split_once("..") {
            let start_date = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
                .map_err(|_| invalid("start date is not YYYY-MM-DD"))?;
            let end_date = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
                .map_err(|_| invalid("end date is not YYYY-MM-DD"))?;
            if end_date < start_date {
                return Err(invalid("end date is before start date"));
            }
            return Ok(Self {
                start_date,
                end_date,
            });
        }

        let start_date = NaiveDate::parse_from_str(&format!("{}-01", identifier), "%Y-%m-%d")
            .map_err(|_| invalid("expected YYYY-MM or YYYY-MM-DD..YYYY-MM-DD"))?;
        let (next_year, next_month) = if start_date.month() == 12 {
            (start_date.year() + 1, 1)
        } else {
            (start_date.year(), start_date.month() + 1)
        };
        let end_date = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| invalid("month is out of range"))?;

        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Checks if a given date falls within this pay period.
    ///
    /// The check is inclusive of both start and end dates.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

impl FromStr for PayPeriod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}
