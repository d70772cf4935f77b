//! Plan-type tag to calculator lookup.
//!
//! The registry is built once and is read-only afterwards. Every tag,
//! including legacy aliases, is registered explicitly; nothing is inferred
//! from the contents of a tag.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationRequest, CalculationResult};

use super::{
    Calculator, CommissionCalculator, FixedCalculator, FormulaCalculator,
    TieredCommissionCalculator,
};

/// Tags served by the fixed calculator.
pub const FIXED_TAGS: [&str; 3] = ["fixed", "fixed_salary", "salary"];
/// Tags served by the commission calculator.
pub const COMMISSION_TAGS: [&str; 4] = [
    "commission",
    "sales_commission",
    "commission_based",
    "basic_commission",
];
/// Tags served by the tiered commission calculator.
pub const TIERED_COMMISSION_TAGS: [&str; 3] =
    ["tiered_commission", "tiered", "progressive_commission"];
/// Tags served by the formula calculator.
pub const FORMULA_TAGS: [&str; 3] = ["formula", "formula_based", "custom_formula"];

/// Builder for a [`CalculatorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    calculators: HashMap<String, Arc<dyn Calculator>>,
}

impl RegistryBuilder {
    /// Registers a calculator under a tag, replacing any previous one.
    pub fn register(mut self, tag: impl Into<String>, calculator: Arc<dyn Calculator>) -> Self {
        self.calculators.insert(tag.into(), calculator);
        self
    }

    /// Registers one calculator instance under several tags.
    pub fn register_all(mut self, tags: &[&str], calculator: Arc<dyn Calculator>) -> Self {
        for tag in tags {
            self.calculators.insert((*tag).to_string(), Arc::clone(&calculator));
        }
        self
    }

    /// Makes `alias` resolve to the calculator already registered as `target`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPlanType` if `target` is not registered.
    pub fn alias(mut self, alias: impl Into<String>, target: &str) -> EngineResult<Self> {
        let calculator = self
            .calculators
            .get(target)
            .cloned()
            .ok_or_else(|| EngineError::UnknownPlanType {
                plan_type: target.to_string(),
            })?;
        self.calculators.insert(alias.into(), calculator);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> CalculatorRegistry {
        CalculatorRegistry {
            calculators: self.calculators,
        }
    }
}

/// Immutable table of calculators keyed by plan-type tag.
///
/// Cheap to share behind an `Arc`; every calculator is `Send + Sync`.
///
/// # Example
///
/// ```
/// use compensation_engine::calculation::CalculatorRegistry;
/// use compensation_engine::config::EngineConfig;
/// use compensation_engine::models::{CalculationRequest, CompensationPlan, EmployeeSnapshot};
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// let registry = CalculatorRegistry::standard(&EngineConfig::default());
/// let request = CalculationRequest::new(
///     EmployeeSnapshot::new("emp_001"),
///     CompensationPlan::new("p1", "salary", "Salaried", json!({ "base_salary": 2800 })),
///     Decimal::ZERO,
///     "2026-01",
/// );
///
/// let result = registry.calculate(&request);
/// assert!(result.success);
/// assert_eq!(result.total, Decimal::from(2800));
/// ```
pub struct CalculatorRegistry {
    calculators: HashMap<String, Arc<dyn Calculator>>,
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl CalculatorRegistry {
    /// Starts an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The registry with all four calculators and their documented tags.
    pub fn standard(config: &EngineConfig) -> Self {
        Self::builder()
            .register_all(&FIXED_TAGS, Arc::new(FixedCalculator::new(&config.cache)))
            .register_all(
                &COMMISSION_TAGS,
                Arc::new(CommissionCalculator::new(&config.cache)),
            )
            .register_all(
                &TIERED_COMMISSION_TAGS,
                Arc::new(TieredCommissionCalculator::new(&config.cache)),
            )
            .register_all(&FORMULA_TAGS, Arc::new(FormulaCalculator::new(&config.formula)))
            .build()
    }

    /// Looks up the calculator for a plan-type tag.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPlanType` if nothing is registered under `tag`.
    pub fn get_calculator(&self, tag: &str) -> EngineResult<Arc<dyn Calculator>> {
        self.calculators
            .get(tag)
            .cloned()
            .ok_or_else(|| EngineError::UnknownPlanType {
                plan_type: tag.to_string(),
            })
    }

    /// Returns true if `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.calculators.contains_key(tag)
    }

    /// All registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.calculators.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Calculates one request. An unknown plan type is a failed result.
    pub fn calculate(&self, request: &CalculationRequest) -> CalculationResult {
        match self.get_calculator(&request.plan.plan_type) {
            Ok(calculator) => calculator.calculate(request),
            Err(error) => {
                warn!(
                    employee_id = %request.employee.id,
                    plan_id = %request.plan.id,
                    error = %error,
                    "No calculator for plan"
                );
                CalculationResult::failure(request, error.to_string())
            }
        }
    }

    /// Calculates every request, in order. A failed row never stops the batch.
    pub fn calculate_batch(&self, requests: &[CalculationRequest]) -> Vec<CalculationResult> {
        let results: Vec<CalculationResult> = requests.iter().map(|r| self.calculate(r)).collect();
        debug!(
            requests = requests.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Batch calculated"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompensationPlan, EmployeeSnapshot, PlanKind};
    use serde_json::json;

    fn create_request(plan_type: &str) -> CalculationRequest {
        CalculationRequest::new(
            EmployeeSnapshot::new("emp_001"),
            CompensationPlan::new("p1", plan_type, "Plan", json!({ "base_salary": 1000 })),
            rust_decimal::Decimal::ZERO,
            "2026-01",
        )
    }

    #[test]
    fn test_standard_tags_resolve_to_expected_kinds() {
        let registry = CalculatorRegistry::standard(&EngineConfig::default());
        let cases = [
            (&FIXED_TAGS[..], PlanKind::Fixed),
            (&COMMISSION_TAGS[..], PlanKind::Commission),
            (&TIERED_COMMISSION_TAGS[..], PlanKind::TieredCommission),
            (&FORMULA_TAGS[..], PlanKind::FormulaBased),
        ];

        for (tags, kind) in cases {
            for tag in tags {
                assert_eq!(registry.get_calculator(tag).unwrap().kind(), kind, "{}", tag);
            }
        }
        assert_eq!(registry.tags().len(), 13);
    }

    #[test]
    fn test_aliases_share_one_instance() {
        let registry = CalculatorRegistry::standard(&EngineConfig::default());
        let a = registry.get_calculator("commission").unwrap();
        let b = registry.get_calculator("sales_commission").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = CalculatorRegistry::standard(&EngineConfig::default());

        let error = registry.get_calculator("bespoke").err().unwrap();
        assert_eq!(
            error,
            EngineError::UnknownPlanType {
                plan_type: "bespoke".to_string()
            }
        );

        let result = registry.calculate(&create_request("bespoke"));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown plan type: bespoke"));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let registry = CalculatorRegistry::standard(&EngineConfig::default());
        assert!(registry.contains("fixed"));
        assert!(!registry.contains("Fixed"));
    }

    #[test]
    fn test_builder_alias() {
        let registry = CalculatorRegistry::builder()
            .register("fixed", Arc::new(FixedCalculator::uncached()))
            .alias("monthly_salary", "fixed")
            .unwrap()
            .build();

        assert_eq!(registry.get_calculator("monthly_salary").unwrap().kind(), PlanKind::Fixed);
        assert_eq!(registry.tags(), vec!["fixed", "monthly_salary"]);
    }

    #[test]
    fn test_alias_to_unregistered_target_fails() {
        let result = CalculatorRegistry::builder().alias("salary", "fixed");
        assert!(matches!(result, Err(EngineError::UnknownPlanType { .. })));
    }

    #[test]
    fn test_batch_tolerates_failed_rows() {
        let registry = CalculatorRegistry::standard(&EngineConfig::default().without_cache());
        let requests = vec![
            create_request("fixed"),
            create_request("bespoke"),
            create_request("salary"),
        ];

        let results = registry.calculate_batch(&requests);

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
    }
}
