//! Compensation plan model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The calculation strategy a plan type tag resolves to.
///
/// Tags are free-form strings on the plan; the
/// [`CalculatorRegistry`](crate::calculation::CalculatorRegistry) maps each
/// registered tag (and alias) onto one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Base salary with optional tiered bonus and commission block.
    Fixed,
    /// Base salary plus a thresholded commission on sales.
    Commission,
    /// Progressive commission over sales brackets.
    TieredCommission,
    /// Pay computed by a declarative formula.
    FormulaBased,
}

impl PlanKind {
    /// Returns the canonical tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Fixed => "fixed",
            PlanKind::Commission => "commission",
            PlanKind::TieredCommission => "tiered_commission",
            PlanKind::FormulaBased => "formula_based",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named compensation plan assigned to an employee.
///
/// `config` is kept opaque here; each calculator parses the shape it expects
/// (see [`SalaryStructure`](super::SalaryStructure),
/// [`TieredCommissionConfig`](super::TieredCommissionConfig) and
/// [`FormulaPlan`](super::FormulaPlan)).
///
/// # Example
///
/// ```
/// use compensation_engine::models::CompensationPlan;
/// use serde_json::json;
///
/// let plan: CompensationPlan = serde_json::from_value(json!({
///     "id": "plan_001",
///     "type": "sales_commission",
///     "name": "Field Sales",
///     "config": { "base_salary": 3000, "commission_rate": 10 }
/// })).unwrap();
/// assert_eq!(plan.plan_type, "sales_commission");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationPlan {
    /// Unique identifier for the plan.
    pub id: String,
    /// The plan type tag used for calculator lookup.
    #[serde(rename = "type")]
    pub plan_type: String,
    /// Human-readable plan name.
    pub name: String,
    /// Plan-type specific configuration.
    #[serde(default)]
    pub config: Value,
}

impl CompensationPlan {
    /// Creates a plan.
    pub fn new(
        id: impl Into<String>,
        plan_type: impl Into<String>,
        name: impl Into<String>,
        config: Value,
    ) -> Self {
        Self {
            id: id.into(),
            plan_type: plan_type.into(),
            name: name.into(),
            config,
        }
    }
}
