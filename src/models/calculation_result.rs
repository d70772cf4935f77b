//! Calculation result models for the compensation engine.
//!
//! This module contains the [`CalculationResult`] type and the detail lines
//! that itemize it for auditable rendering.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{CalculationRequest, ExecutionTrace, Transaction};

/// The kind of a detail line.
///
/// # Example
///
/// ```
/// use compensation_engine::models::DetailType;
///
/// let kind = DetailType::TargetBonus;
/// assert_eq!(serde_json::to_string(&kind).unwrap(), "\"target_bonus\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailType {
    /// Base salary.
    BaseSalary,
    /// Commission (single-rate).
    Commission,
    /// One bracket's share of a progressive commission.
    CommissionTier,
    /// Target or tiered bonus.
    TargetBonus,
    /// A bonus transaction.
    Bonus,
    /// A deduction transaction.
    Deduction,
    /// A loan repayment transaction.
    Loan,
    /// The final value of a formula plan.
    FormulaOutput,
}

/// A single itemized line of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLine {
    /// What the line represents.
    #[serde(rename = "type")]
    pub detail_type: DetailType,
    /// The line amount. Deductions and loans are positive; the type gives the sign.
    pub amount: Decimal,
    /// Human-readable explanation.
    pub description: String,
}

impl DetailLine {
    /// Creates a detail line.
    pub fn new(detail_type: DetailType, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            detail_type,
            amount,
            description: description.into(),
        }
    }
}

/// The plan-specific earnings a calculator produces, before transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Earnings {
    /// Base salary.
    pub base_salary: Decimal,
    /// Commission.
    pub commission: Decimal,
    /// Target bonus.
    pub target_bonus: Decimal,
    /// Detail lines for the above, in base, commission, target bonus order.
    /// A formula plan appends its output line last.
    pub details: Vec<DetailLine>,
}

/// The complete result of a compensation calculation.
///
/// Failed calculations are ordinary values with `success == false`, zeroed
/// amounts, and an `error` message, so a batch can render them inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// The employee the calculation is for.
    pub employee_id: String,
    /// The period identifier from the request.
    pub period: String,
    /// The plan type tag.
    pub plan_type: String,
    /// The plan name.
    pub plan_name: String,
    /// Base salary.
    pub base_salary: Decimal,
    /// Commission.
    pub commission: Decimal,
    /// Target bonus.
    pub target_bonus: Decimal,
    /// Sum of bonus transactions.
    pub bonus_total: Decimal,
    /// Sum of deduction transactions.
    pub deductions_total: Decimal,
    /// Sum of loan repayment transactions.
    pub loans_total: Decimal,
    /// Net pay for the period.
    pub total: Decimal,
    /// Itemized lines: base, commission, target bonus, bonuses, deductions, loans.
    pub details: Vec<DetailLine>,
    /// Whether the calculation succeeded.
    pub success: bool,
    /// The failure message, when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The formula execution trace, for formula-based plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<ExecutionTrace>,
}

impl CalculationResult {
    /// Combines a calculator's earnings with the request's transactions.
    ///
    /// `total = base + commission + target bonus + bonuses - deductions - loans`.
    ///
    /// # Errors
    ///
    /// Returns `CalculationError` if any sum overflows. Calculators propagate
    /// it, so the row is reported as failed instead of panicking.
    ///
    /// # Example
    ///
    /// ```
    /// use compensation_engine::models::{
    ///     CalculationRequest, CalculationResult, CompensationPlan, Earnings, EmployeeSnapshot,
    /// };
    /// use rust_decimal::Decimal;
    /// use serde_json::json;
    ///
    /// let request = CalculationRequest::new(
    ///     EmployeeSnapshot::new("emp_001"),
    ///     CompensationPlan::new("p1", "fixed", "Salaried", json!({ "base_salary": 3000 })),
    ///     Decimal::ZERO,
    ///     "2026-01",
    /// );
    /// let earnings = Earnings { base_salary: Decimal::from(3000), ..Earnings::default() };
    ///
    /// let result = CalculationResult::assemble(&request, earnings).unwrap();
    /// assert!(result.success);
    /// assert_eq!(result.total, Decimal::from(3000));
    /// ```
    pub fn assemble(request: &CalculationRequest, earnings: Earnings) -> EngineResult<Self> {
        let bonus_total = request.bonus_total()?;
        let deductions_total = request.deductions_total()?;
        let loans_total = request.loans_total()?;

        let mut details = earnings.details;
        details.extend(transaction_lines(DetailType::Bonus, &request.bonuses));
        details.extend(transaction_lines(DetailType::Deduction, &request.deductions));
        details.extend(transaction_lines(DetailType::Loan, &request.loans));

        let total = [earnings.commission, earnings.target_bonus, bonus_total]
            .into_iter()
            .try_fold(earnings.base_salary, |acc, amount| acc.checked_add(amount))
            .and_then(|gross| gross.checked_sub(deductions_total))
            .and_then(|net| net.checked_sub(loans_total))
            .ok_or_else(|| EngineError::overflow("net total"))?;

        Ok(Self {
            employee_id: request.employee.id.clone(),
            period: request.period.clone(),
            plan_type: request.plan.plan_type.clone(),
            plan_name: request.plan.name.clone(),
            base_salary: earnings.base_salary,
            commission: earnings.commission,
            target_bonus: earnings.target_bonus,
            bonus_total,
            deductions_total,
            loans_total,
            total,
            details,
            success: true,
            error: None,
            trace: None,
        })
    }

    /// Builds a failed result for a request.
    pub fn failure(request: &CalculationRequest, message: impl Into<String>) -> Self {
        let mut result = Self::empty(&request.employee.id, &request.period);
        result.plan_type = request.plan.plan_type.clone();
        result.plan_name = request.plan.name.clone();
        result.error = Some(message.into());
        result
    }

    /// Builds the failed row for an employee with no plan assigned.
    pub fn no_plan(employee_id: &str, period: &str) -> Self {
        let mut result = Self::empty(employee_id, period);
        result.error = Some("No compensation plan assigned".to_string());
        result
    }

    /// Replaces the net total, for plans whose output is computed directly.
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    /// Attaches a formula execution trace.
    pub fn with_trace(mut self, trace: ExecutionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    fn empty(employee_id: &str, period: &str) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            period: period.to_string(),
            plan_type: String::new(),
            plan_name: String::new(),
            base_salary: Decimal::ZERO,
            commission: Decimal::ZERO,
            target_bonus: Decimal::ZERO,
            bonus_total: Decimal::ZERO,
            deductions_total: Decimal::ZERO,
            loans_total: Decimal::ZERO,
            total: Decimal::ZERO,
            details: Vec::new(),
            success: false,
            error: None,
            trace: None,
        }
    }
}

fn transaction_lines(
    detail_type: DetailType,
    transactions: &[Transaction],
) -> impl Iterator<Item = DetailLine> + '_ {
    transactions.iter().map(move |t| {
        let description = if t.description.is_empty() {
            t.id.clone()
        } else {
            t.description.clone()
        };
        DetailLine::new(detail_type, t.amount, description)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompensationPlan, EmployeeSnapshot};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn txn(id: &str, amount: &str, description: &str) -> Transaction {
        Transaction::new(
            id,
            "emp_001",
            dec(amount),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            description,
        )
    }

    fn create_request() -> CalculationRequest {
        let mut request = CalculationRequest::new(
            EmployeeSnapshot::new("emp_001"),
            CompensationPlan::new("p1", "commission", "Field Sales", json!({})),
            dec("8000"),
            "2026-01",
        );
        request.bonuses = vec![txn("b1", "200", "Referral")];
        request.deductions = vec![txn("d1", "50", "")];
        request.loans = vec![txn("l1", "120.50", "Laptop")];
        request
    }

    #[test]
    fn test_assemble_computes_net_total() {
        let earnings = Earnings {
            base_salary: dec("3000"),
            commission: dec("300"),
            target_bonus: dec("100"),
            details: vec![],
        };

        let result = CalculationResult::assemble(&create_request(), earnings).unwrap();

        assert_eq!(result.bonus_total, dec("200"));
        assert_eq!(result.deductions_total, dec("50"));
        assert_eq!(result.loans_total, dec("120.50"));
        assert_eq!(result.total, dec("3429.50"));
        assert_eq!(result.plan_type, "commission");
        assert_eq!(result.plan_name, "Field Sales");
        assert!(result.success);
    }

    #[test]
    fn test_assemble_orders_detail_lines() {
        let earnings = Earnings {
            base_salary: dec("3000"),
            commission: Decimal::ZERO,
            target_bonus: Decimal::ZERO,
            details: vec![DetailLine::new(DetailType::BaseSalary, dec("3000"), "Base")],
        };

        let result = CalculationResult::assemble(&create_request(), earnings).unwrap();
        let kinds: Vec<DetailType> = result.details.iter().map(|d| d.detail_type).collect();

        assert_eq!(
            kinds,
            vec![
                DetailType::BaseSalary,
                DetailType::Bonus,
                DetailType::Deduction,
                DetailType::Loan
            ]
        );
        // Transactions without a description fall back to their ID.
        assert_eq!(result.details[2].description, "d1");
    }

    #[test]
    fn test_assemble_overflow_is_error() {
        let earnings = Earnings {
            base_salary: Decimal::MAX,
            ..Earnings::default()
        };

        let error = CalculationResult::assemble(&create_request(), earnings).unwrap_err();
        assert!(matches!(error, EngineError::CalculationError { .. }));
    }

    #[test]
    fn test_failure_is_zeroed_with_message() {
        let result = CalculationResult::failure(&create_request(), "calculation failed: boom");

        assert!(!result.success);
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.details.is_empty());
        assert_eq!(result.error.as_deref(), Some("calculation failed: boom"));
        assert_eq!(result.plan_type, "commission");
    }

    #[test]
    fn test_no_plan_row() {
        let result = CalculationResult::no_plan("emp_009", "2026-01");
        assert!(!result.success);
        assert_eq!(result.employee_id, "emp_009");
        assert_eq!(result.error.as_deref(), Some("No compensation plan assigned"));
    }

    #[test]
    fn test_serialization_uses_interface_field_names() {
        let result = CalculationResult::assemble(&create_request(), Earnings::default()).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert!(value.get("baseSalary").is_some());
        assert!(value.get("deductionsTotal").is_some());
        assert!(value.get("planType").is_some());
        assert!(value.get("error").is_none());
        assert_eq!(value["details"][0]["type"], "bonus");
    }
}
