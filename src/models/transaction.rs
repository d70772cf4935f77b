//! Bonus, deduction, and loan transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::PayPeriod;

/// A single bonus, deduction, or loan repayment for an employee.
///
/// The kind is implied by which list of the request it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier for the transaction.
    pub id: String,
    /// The employee the transaction belongs to.
    pub employee_id: String,
    /// The transaction amount (always positive; the kind determines the sign).
    pub amount: Decimal,
    /// The date the transaction was recorded.
    pub date: NaiveDate,
    /// Free-text description shown on detail lines.
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    /// Sums the amounts of a list of transactions.
    ///
    /// # Example
    ///
    /// ```
    /// use compensation_engine::models::Transaction;
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    /// let bonuses = vec![
    ///     Transaction::new("b1", "emp_001", Decimal::from(100), date, "Referral"),
    ///     Transaction::new("b2", "emp_001", Decimal::from(50), date, "Spot award"),
    /// ];
    /// assert_eq!(Transaction::total(&bonuses).unwrap(), Decimal::from(150));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `CalculationError` if the sum overflows.
    pub fn total(transactions: &[Transaction]) -> EngineResult<Decimal> {
        transactions.iter().try_fold(Decimal::ZERO, |acc, t| {
            acc.checked_add(t.amount)
                .ok_or_else(|| EngineError::overflow("transaction total"))
        })
    }

    /// Creates a transaction.
    pub fn new(
        id: impl Into<String>,
        employee_id: impl Into<String>,
        amount: Decimal,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            employee_id: employee_id.into(),
            amount,
            date,
            description: description.into(),
        }
    }

    /// Returns true if the transaction date falls within the period.
    pub fn within_period(&self, period: &PayPeriod) -> bool {
        period.contains_date(self.date)
    }

    /// Selects one employee's transactions for a period.
    ///
    /// This is the caller-side filter applied before transactions are put on a
    /// [`CalculationRequest`](super::CalculationRequest).
    pub fn for_employee_in_period(
        transactions: &[Transaction],
        employee_id: &str,
        period: &PayPeriod,
    ) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| t.employee_id == employee_id && t.within_period(period))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_total_of_empty_list_is_zero() {
        assert_eq!(Transaction::total(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_total_sums_fractional_amounts() {
        let items = vec![
            Transaction::new("d1", "emp_001", dec("10.25"), date(2026, 1, 3), ""),
            Transaction::new("d2", "emp_001", dec("4.75"), date(2026, 1, 9), ""),
        ];
        assert_eq!(Transaction::total(&items).unwrap(), dec("15.00"));
    }

    #[test]
    fn test_total_overflow_is_error() {
        let items = vec![
            Transaction::new("b1", "emp_001", Decimal::MAX, date(2026, 1, 3), ""),
            Transaction::new("b2", "emp_001", Decimal::ONE, date(2026, 1, 9), ""),
        ];
        assert!(matches!(
            Transaction::total(&items),
            Err(EngineError::CalculationError { .. })
        ));
    }

    #[test]
    fn test_for_employee_in_period_filters_both_ways() {
        let period = PayPeriod::parse("2026-01").unwrap();
        let items = vec![
            Transaction::new("t1", "emp_001", dec("100"), date(2026, 1, 5), "in"),
            Transaction::new("t2", "emp_001", dec("100"), date(2026, 2, 1), "next month"),
            Transaction::new("t3", "emp_002", dec("100"), date(2026, 1, 5), "other employee"),
            Transaction::new("t4", "emp_001", dec("100"), date(2026, 1, 31), "last day"),
        ];

        let selected = Transaction::for_employee_in_period(&items, "emp_001", &period);
        let ids: Vec<&str> = selected.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t4"]);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "loan_1",
            "employeeId": "emp_001",
            "amount": 250,
            "date": "2026-01-15",
            "description": "Laptop loan"
        }"#;

        let transaction: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(transaction.employee_id, "emp_001");
        assert_eq!(transaction.amount, dec("250"));
        assert_eq!(transaction.description, "Laptop loan");
    }
}
