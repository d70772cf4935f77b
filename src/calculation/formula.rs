//! Formula-based calculation.
//!
//! Runs the plan's [`FormulaPlan`] through the shared [`FormulaEvaluator`].
//! The net total is the formula's output value. The itemized fields are read
//! from the conventional context names `baseSalary`, `commission` and
//! `targetBonus` (zero when a formula does not bind them).

use crate::config::FormulaSettings;
use crate::error::EngineResult;
use crate::formula::{BASE_SALARY, COMMISSION, FormulaEvaluator, TARGET_BONUS};
use crate::models::{
    CalculationRequest, CalculationResult, DetailLine, DetailType, Earnings, FormulaPlan, PlanKind,
};

use super::Calculator;
use super::salary::base_salary_line;

/// Calculator for formula-based plans.
///
/// Results depend on employee attributes, so they are never cached.
#[derive(Debug, Clone, Default)]
pub struct FormulaCalculator {
    evaluator: FormulaEvaluator,
}

impl FormulaCalculator {
    /// Creates a calculator with the given interpreter limits.
    pub fn new(settings: &FormulaSettings) -> Self {
        Self {
            evaluator: FormulaEvaluator::new(settings),
        }
    }
}

impl Calculator for FormulaCalculator {
    fn kind(&self) -> PlanKind {
        PlanKind::FormulaBased
    }

    fn compute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult> {
        let formula = FormulaPlan::from_plan(&request.plan)?;
        let context = FormulaEvaluator::request_context(&formula, request)?;
        let outcome = self.evaluator.evaluate(&formula, context);

        if let Some(error) = &outcome.error {
            return Ok(
                CalculationResult::failure(request, error.to_string()).with_trace(outcome.trace),
            );
        }

        let base_salary = outcome.value_or_zero(BASE_SALARY);
        let commission = outcome.value_or_zero(COMMISSION);
        let target_bonus = outcome.value_or_zero(TARGET_BONUS);

        let mut details = Vec::new();
        if !base_salary.is_zero() {
            details.push(base_salary_line(base_salary));
        }
        if !commission.is_zero() {
            details.push(DetailLine::new(DetailType::Commission, commission, "Commission"));
        }
        if !target_bonus.is_zero() {
            details.push(DetailLine::new(DetailType::TargetBonus, target_bonus, "Target bonus"));
        }
        details.push(DetailLine::new(
            DetailType::FormulaOutput,
            outcome.result,
            format!("Formula output '{}'", formula.output_variable),
        ));

        let result = CalculationResult::assemble(
            request,
            Earnings {
                base_salary,
                commission,
                target_bonus,
                details,
            },
        )?;

        Ok(result.with_total(outcome.result).with_trace(outcome.trace))
    }
}
