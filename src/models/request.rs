//! Calculation request model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

use super::{CompensationPlan, EmployeeSnapshot, Transaction};

/// Everything a calculator needs for one employee and one period.
///
/// The caller has already resolved the plan and filtered the transactions to
/// the period (see [`Transaction::for_employee_in_period`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    /// The employee being paid.
    pub employee: EmployeeSnapshot,
    /// The employee's compensation plan.
    pub plan: CompensationPlan,
    /// Sales attributed to the employee for the period.
    #[serde(default)]
    pub sales_amount: Decimal,
    /// Bonus transactions in the period.
    #[serde(default)]
    pub bonuses: Vec<Transaction>,
    /// Deduction transactions in the period.
    #[serde(default)]
    pub deductions: Vec<Transaction>,
    /// Loan repayment transactions in the period.
    #[serde(default)]
    pub loans: Vec<Transaction>,
    /// The period identifier, e.g. `2026-01`.
    pub period: String,
}

impl CalculationRequest {
    /// Creates a request with no transactions.
    pub fn new(
        employee: EmployeeSnapshot,
        plan: CompensationPlan,
        sales_amount: Decimal,
        period: impl Into<String>,
    ) -> Self {
        Self {
            employee,
            plan,
            sales_amount,
            bonuses: Vec::new(),
            deductions: Vec::new(),
            loans: Vec::new(),
            period: period.into(),
        }
    }

    /// Sum of bonus transactions.
    ///
    /// The three totals fail with `CalculationError` on overflow.
    pub fn bonus_total(&self) -> EngineResult<Decimal> {
        Transaction::total(&self.bonuses)
    }

    /// Sum of deduction transactions.
    pub fn deductions_total(&self) -> EngineResult<Decimal> {
        Transaction::total(&self.deductions)
    }

    /// Sum of loan repayment transactions.
    pub fn loans_total(&self) -> EngineResult<Decimal> {
        Transaction::total(&self.loans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_calculation_request() {
        let json = r#"{
            "employee": { "id": "emp_001", "level": 2 },
            "plan": {
                "id": "plan_001",
                "type": "commission",
                "name": "Field Sales",
                "config": { "base_salary": 3000 }
            },
            "salesAmount": "8000",
            "bonuses": [
                { "id": "b1", "employeeId": "emp_001", "amount": 100,
                  "date": "2026-01-10", "description": "Referral" }
            ],
            "deductions": [
                { "id": "d1", "employeeId": "emp_001", "amount": "25.50",
                  "date": "2026-01-11" }
            ],
            "period": "2026-01"
        }"#;

        let request: CalculationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.employee.id, "emp_001");
        assert_eq!(request.plan.plan_type, "commission");
        assert_eq!(request.sales_amount, Decimal::from(8000));
        assert_eq!(request.bonus_total().unwrap(), Decimal::from(100));
        assert_eq!(request.deductions_total().unwrap(), Decimal::from_str("25.50").unwrap());
        assert_eq!(request.loans_total().unwrap(), Decimal::ZERO);
        assert_eq!(request.period, "2026-01");
    }
}
