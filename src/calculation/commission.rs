//! Sales commission calculation.
//!
//! A commission plan pays its base salary, a single-rate commission on sales
//! above a threshold, and the bonus of the highest tier of its tiered bonus
//! table that sales reach.
//!
//! ## Rules
//!
//! - Commission is zero when sales are below the threshold or the rate is not
//!   positive.
//! - Otherwise commission is `(sales - threshold) * rate`, rounded half away
//!   from zero to whole units.
//! - Rates above 1 are whole percentages (`10` means 10%).

use rust_decimal::Decimal;

use crate::config::CacheSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationRequest, CalculationResult, CommissionTerms, DetailLine, DetailType, Earnings,
    PlanKind, SalaryStructure,
};

use super::Calculator;
use super::result_cache::ResultCache;
use super::salary::{base_salary_line, normalize_rate, round_units, tier_bonus};

/// Calculator for base-plus-commission plans.
///
/// # Example
///
/// ```
/// use compensation_engine::calculation::{Calculator, CommissionCalculator};
/// use compensation_engine::models::{CalculationRequest, CompensationPlan, EmployeeSnapshot};
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// let plan = CompensationPlan::new(
///     "plan_sales",
///     "commission",
///     "Field Sales",
///     json!({ "blocks": [
///         { "type": "basic_salary", "amount": 3000 },
///         { "type": "commission", "rate": 0.1, "threshold": 5000 }
///     ] }),
/// );
/// let request = CalculationRequest::new(
///     EmployeeSnapshot::new("emp_001"),
///     plan,
///     Decimal::from(8000),
///     "2026-01",
/// );
///
/// let result = CommissionCalculator::uncached().calculate(&request);
/// assert_eq!(result.commission, Decimal::from(300));
/// assert_eq!(result.total, Decimal::from(3300));
/// ```
#[derive(Debug)]
pub struct CommissionCalculator {
    cache: Option<ResultCache>,
}

impl CommissionCalculator {
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

impl Calculator for CommissionCalculator {
    fn kind(&self) -> PlanKind {
        PlanKind::Commission
    }

    fn compute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult> {
        let structure = SalaryStructure::from_plan(&request.plan)?;
        let sales = request.sales_amount;

        let mut details = vec![base_salary_line(structure.base_salary)];
        let terms = structure.commission.unwrap_or(CommissionTerms {
            rate: Decimal::ZERO,
            threshold: Decimal::ZERO,
        });
        let commission = calculate_commission(terms, sales)?;
        if !commission.is_zero() {
            details.push(DetailLine::new(
                DetailType::Commission,
                commission,
                format!(
                    "Commission at {}% on {} above threshold {}",
                    (normalize_rate(terms.rate) * Decimal::ONE_HUNDRED).normalize(),
                    sales - terms.threshold,
                    terms.threshold
                ),
            ));
        }

        let (target_bonus, bonus_line) = tier_bonus(&structure.bonus_tiers, sales);
        details.extend(bonus_line);

        CalculationResult::assemble(
            request,
            Earnings {
                base_salary: structure.base_salary,
                commission,
                target_bonus,
                details,
            },
        )
    }

    fn result_cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }
}

/// Applies the commission rules to `sales`.
///
/// # Examples
///
/// Sales of 8000 above a 5000 threshold at 10% earn 300.
pub(crate) fn calculate_commission(
    terms: CommissionTerms,
    sales: Decimal,
) -> EngineResult<Decimal> {
    let rate = normalize_rate(terms.rate);
    if sales < terms.threshold || rate <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let commission = (sales - terms.threshold)
        .checked_mul(rate)
        .ok_or_else(|| EngineError::overflow("commission"))?;
    Ok(round_units(commission))
}
