//! Progressive (bracketed) commission calculation.
//!
//! Brackets work like tax brackets: each bracket's percentage applies only to
//! the slice of sales between the previous bracket's threshold and its own.
//! Sales beyond the last threshold are commissioned at the last bracket's
//! percentage.
//!
//! ```text
//! brackets: [ 5000 @ 5%, 10000 @ 8% ], sales 12000
//!
//!   0     - 5000   5000 @ 5% = 250
//!   5000  - 10000  5000 @ 8% = 400
//!   10000 - 12000  2000 @ 8% = 160
//!                              ---
//!                              810
//! ```
//!
//! ## Caching
//!
//! Results are cached per employee and period only. A changed plan or sales
//! figure within the same period is not seen until the entry is invalidated
//! or expires.

use rust_decimal::Decimal;

use crate::config::CacheSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationRequest, CalculationResult, CommissionBracket, DetailLine, DetailType, Earnings,
    PlanKind, TieredCommissionConfig,
};

use super::Calculator;
use super::result_cache::{CacheKey, ResultCache};
use super::salary::{base_salary_line, round_cents};

/// The share of sales allocated to one bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketAllocation {
    /// Label for the bracket.
    pub name: String,
    /// Sales allocated to the bracket.
    pub allocated: Decimal,
    /// The bracket's percentage.
    pub percentage: Decimal,
    /// Commission earned on the allocation.
    pub contribution: Decimal,
}

impl BracketAllocation {
    fn detail_line(&self) -> DetailLine {
        DetailLine::new(
            DetailType::CommissionTier,
            self.contribution,
            format!(
                "{}: {} at {}%",
                self.name,
                self.allocated,
                self.percentage.normalize()
            ),
        )
    }
}

/// Calculator for progressive commission plans.
#[derive(Debug)]
pub struct TieredCommissionCalculator {
    cache: Option<ResultCache>,
}

impl TieredCommissionCalculator {
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

impl Calculator for TieredCommissionCalculator {
    fn kind(&self) -> PlanKind {
        PlanKind::TieredCommission
    }

    fn compute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult> {
        let config = TieredCommissionConfig::from_plan(&request.plan)?;
        let sales = request.sales_amount;

        let allocations = if sales < config.commission_threshold {
            Vec::new()
        } else {
            allocate_brackets(&config.brackets, sales)?
        };
        let commission = round_cents(allocations.iter().map(|a| a.contribution).sum());

        let mut details = vec![base_salary_line(config.base_salary)];
        details.extend(allocations.iter().map(BracketAllocation::detail_line));

        let target_bonus = match config.target_bonus {
            Some(bonus) if sales >= bonus.threshold => {
                details.push(DetailLine::new(
                    DetailType::TargetBonus,
                    bonus.amount,
                    format!("Target bonus for sales at or above {}", bonus.threshold),
                ));
                bonus.amount
            }
            _ => Decimal::ZERO,
        };

        CalculationResult::assemble(
            request,
            Earnings {
                base_salary: config.base_salary,
                commission,
                target_bonus,
                details,
            },
        )
    }

    fn result_cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    fn cache_key(&self, request: &CalculationRequest) -> CacheKey {
        CacheKey::employee_period(request)
    }
}

/// Splits `sales` across ascending brackets.
///
/// Only brackets that receive a positive allocation are returned. Sales above
/// the last threshold produce one extra allocation at the last percentage.
pub fn allocate_brackets(
    brackets: &[CommissionBracket],
    sales: Decimal,
) -> EngineResult<Vec<BracketAllocation>> {
    let mut allocations = Vec::new();
    let mut lower = Decimal::ZERO;

    for (index, bracket) in brackets.iter().enumerate() {
        if sales <= lower {
            break;
        }
        let slice = sales.min(bracket.threshold) - lower;
        if slice > Decimal::ZERO {
            let name = bracket
                .name
                .clone()
                .unwrap_or_else(|| format!("Bracket {}", index + 1));
            allocations.push(allocation(name, slice, bracket.percentage)?);
        }
        lower = lower.max(bracket.threshold);
    }

    if let Some(last) = brackets.last() {
        if sales > lower {
            let name = match &last.name {
                Some(name) => format!("{} (above {})", name, lower),
                None => format!("Above {}", lower),
            };
            allocations.push(allocation(name, sales - lower, last.percentage)?);
        }
    }

    Ok(allocations)
}

fn allocation(
    name: String,
    allocated: Decimal,
    percentage: Decimal,
) -> EngineResult<BracketAllocation> {
    let contribution = allocated
        .checked_mul(percentage)
        .map(|v| v / Decimal::ONE_HUNDRED)
        .ok_or_else(|| EngineError::overflow("tiered commission"))?;
    Ok(BracketAllocation {
        name,
        allocated,
        percentage,
        contribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompensationPlan, EmployeeSnapshot};
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn example_config() -> Value {
        json!({
            "brackets": [
                { "threshold": 5000, "pct": 5 },
                { "threshold": 10000, "pct": 8 }
            ]
        })
    }

    fn create_request(config: Value, sales: &str) -> CalculationRequest {
        CalculationRequest::new(
            EmployeeSnapshot::new("emp_001"),
            CompensationPlan::new("plan_tiered", "tiered_commission", "Tiered", config),
            dec(sales),
            "2026-01",
        )
    }

    fn brackets() -> Vec<CommissionBracket> {
        vec![
            CommissionBracket {
                threshold: dec("5000"),
                percentage: dec("5"),
                name: Some("Bronze".to_string()),
            },
            CommissionBracket {
                threshold: dec("10000"),
                percentage: dec("8"),
                name: None,
            },
        ]
    }

    #[test]
    fn test_tiered_example() {
        let result = TieredCommissionCalculator::uncached()
            .calculate(&create_request(example_config(), "12000"));

        assert!(result.success);
        assert_eq!(result.commission, dec("810"));
        assert_eq!(result.total, dec("810"));

        let tiers: Vec<&DetailLine> = result
            .details
            .iter()
            .filter(|d| d.detail_type == DetailType::CommissionTier)
            .collect();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].amount, dec("250"));
        assert_eq!(tiers[1].amount, dec("400"));
        assert_eq!(tiers[2].amount, dec("160"));
        assert_eq!(tiers[0].description, "Bracket 1: 5000 at 5%");
    }

    #[test]
    fn test_sales_within_first_bracket() {
        let allocations = allocate_brackets(&brackets(), dec("3000")).unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].name, "Bronze");
        assert_eq!(allocations[0].allocated, dec("3000"));
        assert_eq!(allocations[0].contribution, dec("150"));
    }

    #[test]
    fn test_sales_exactly_at_last_threshold() {
        let allocations = allocate_brackets(&brackets(), dec("10000")).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[1].name, "Bracket 2");
        let total: Decimal = allocations.iter().map(|a| a.contribution).sum();
        assert_eq!(total, dec("650"));
    }

    #[test]
    fn test_overflow_allocation_is_named() {
        let allocations = allocate_brackets(&brackets(), dec("10500")).unwrap();
        assert_eq!(allocations[2].name, "Above 10000");
        assert_eq!(allocations[2].allocated, dec("500"));
    }

    #[test]
    fn test_zero_sales_allocate_nothing() {
        assert!(allocate_brackets(&brackets(), Decimal::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_commission_threshold_gate() {
        let config = json!({
            "base_salary": 2000,
            "commission_threshold": 4000,
            "brackets": [ { "threshold": 5000, "percentage": 5 } ]
        });

        let below = TieredCommissionCalculator::uncached()
            .calculate(&create_request(config.clone(), "3999"));
        assert_eq!(below.commission, Decimal::ZERO);
        assert_eq!(below.total, dec("2000"));

        let above =
            TieredCommissionCalculator::uncached().calculate(&create_request(config, "4000"));
        assert_eq!(above.commission, dec("200"));
    }

    #[test]
    fn test_target_bonus_is_binary() {
        let config = json!({
            "brackets": [ { "threshold": 5000, "percentage": 5 } ],
            "target_bonus": { "threshold": 10000, "amount": 750 }
        });
        let calculator = TieredCommissionCalculator::uncached();

        assert_eq!(
            calculator.calculate(&create_request(config.clone(), "9999")).target_bonus,
            Decimal::ZERO
        );
        assert_eq!(
            calculator.calculate(&create_request(config.clone(), "10000")).target_bonus,
            dec("750")
        );
        assert_eq!(
            calculator.calculate(&create_request(config, "90000")).target_bonus,
            dec("750")
        );
    }

    #[test]
    fn test_unsorted_brackets_are_sorted() {
        let config = json!({
            "brackets": [
                { "threshold": 10000, "percentage": 8 },
                { "threshold": 5000, "percentage": 5 }
            ]
        });
        let result =
            TieredCommissionCalculator::uncached().calculate(&create_request(config, "12000"));
        assert_eq!(result.commission, dec("810"));
    }

    #[test]
    fn test_missing_brackets_is_captured_failure() {
        let result = TieredCommissionCalculator::uncached()
            .calculate(&create_request(json!({ "brackets": [] }), "12000"));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no brackets"));
    }

    #[test]
    fn test_cache_key_ignores_sales() {
        // Cached per employee and period, so a changed sales figure in the
        // same period is served from cache.
        let calculator = TieredCommissionCalculator::new(&CacheSettings::default());

        let first = calculator.calculate(&create_request(example_config(), "12000"));
        let second = calculator.calculate(&create_request(example_config(), "3000"));
        assert_eq!(first.commission, second.commission);

        calculator
            .result_cache()
            .unwrap()
            .invalidate(&CacheKey::employee_period(&create_request(example_config(), "3000")));
        let third = calculator.calculate(&create_request(example_config(), "3000"));
        assert_eq!(third.commission, dec("150"));
    }

    proptest! {
        #[test]
        fn prop_first_bracket_below_threshold_is_single_rate(sales in 0i64..5_000) {
            let sales = Decimal::from(sales);
            let allocations = allocate_brackets(&brackets(), sales).unwrap();
            let total: Decimal = allocations.iter().map(|a| a.contribution).sum();
            prop_assert_eq!(total, sales * dec("5") / Decimal::ONE_HUNDRED);
        }

        #[test]
        fn prop_allocations_cover_sales(sales in 0i64..1_000_000) {
            let sales = Decimal::from(sales);
            let allocations = allocate_brackets(&brackets(), sales).unwrap();
            let allocated: Decimal = allocations.iter().map(|a| a.allocated).sum();
            prop_assert_eq!(allocated, sales);
        }
    }
}
