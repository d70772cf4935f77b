//! Fixed salary calculation.
//!
//! A fixed plan pays its base salary, the bonus of the highest tier of its
//! tiered bonus table that sales reach, and (when the plan has a commission
//! block) commission on sales above the block's threshold.
//!
//! ## Rounding
//!
//! Commission is rounded half away from zero to cents.

use rust_decimal::Decimal;

use crate::config::CacheSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationRequest, CalculationResult, CommissionTerms, DetailLine, DetailType, Earnings,
    PlanKind, SalaryStructure,
};

use super::Calculator;
use super::result_cache::ResultCache;
use super::salary::{base_salary_line, normalize_rate, round_cents, tier_bonus};

/// Calculator for fixed salary plans.
///
/// # Example
///
/// ```
/// use compensation_engine::calculation::{Calculator, FixedCalculator};
/// use compensation_engine::models::{CalculationRequest, CompensationPlan, EmployeeSnapshot};
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// let plan = CompensationPlan::new(
///     "plan_fixed",
///     "fixed",
///     "Salaried",
///     json!({ "blocks": [
///         { "type": "basic_salary", "amount": 4000,
///           "tiered_bonus": [ { "threshold": 10000, "bonus": 250 } ] }
///     ] }),
/// );
/// let request = CalculationRequest::new(
///     EmployeeSnapshot::new("emp_001"),
///     plan,
///     Decimal::from(12000),
///     "2026-01",
/// );
///
/// let result = FixedCalculator::uncached().calculate(&request);
/// assert!(result.success);
/// assert_eq!(result.total, Decimal::from(4250));
/// ```
#[derive(Debug)]
pub struct FixedCalculator {
    cache: Option<ResultCache>,
}

impl FixedCalculator {
    /// Creates a calculator, with a result cache when `settings.enabled`.
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            cache: settings.enabled.then(|| ResultCache::new(settings)),
        }
    }

    /// Creates a calculator without a result cache.
    pub fn uncached() -> Self {
        Self { cache: None }
    }
}

impl Calculator for FixedCalculator {
    fn kind(&self) -> PlanKind {
        PlanKind::Fixed
    }

    fn compute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult> {
        let structure = SalaryStructure::from_plan(&request.plan)?;
        let earnings = fixed_earnings(&structure, request.sales_amount)?;
        CalculationResult::assemble(request, earnings)
    }

    fn result_cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }
}

fn fixed_earnings(structure: &SalaryStructure, sales: Decimal) -> EngineResult<Earnings> {
    let mut details = vec![base_salary_line(structure.base_salary)];

    let commission = match structure.commission {
        Some(terms) => {
            let commission = commission_above_threshold(terms, sales)?;
            if !commission.is_zero() {
                details.push(DetailLine::new(
                    DetailType::Commission,
                    commission,
                    format!(
                        "Commission at {}% on sales above {}",
                        (normalize_rate(terms.rate) * Decimal::ONE_HUNDRED).normalize(),
                        terms.threshold
                    ),
                ));
            }
            commission
        }
        None => Decimal::ZERO,
    };

    let (target_bonus, bonus_line) = tier_bonus(&structure.bonus_tiers, sales);
    details.extend(bonus_line);

    Ok(Earnings {
        base_salary: structure.base_salary,
        commission,
        target_bonus,
        details,
    })
}

/// `(sales - threshold) * rate` when sales exceed the threshold, else zero.
fn commission_above_threshold(terms: CommissionTerms, sales: Decimal) -> EngineResult<Decimal> {
    let rate = normalize_rate(terms.rate);
    if sales <= terms.threshold || rate <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let commission = (sales - terms.threshold)
        .checked_mul(rate)
        .ok_or_else(|| EngineError::overflow("fixed plan commission"))?;
    Ok(round_cents(commission))
}
