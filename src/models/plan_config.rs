//! Typed views over a plan's opaque configuration.
//!
//! Salary-style plans (fixed and commission) accept two shapes:
//!
//! ```text
//! { "blocks": [
//!     { "type": "basic_salary", "amount": 3000,
//!       "tiered_bonus": [ { "threshold": 10000, "bonus": 500 } ] },
//!     { "type": "commission", "rate": 0.1, "threshold": 5000 } ] }
//! ```
//!
//! and the legacy flat shape:
//!
//! ```text
//! { "base_salary": 3000, "commission_rate": 10, "commission_threshold": 5000,
//!   "bonus_tiers": [ { "threshold": 10000, "bonus": 500 } ] }
//! ```

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

use super::CompensationPlan;

/// One row of a tiered bonus table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTier {
    /// Minimum sales needed to earn this tier's bonus.
    pub threshold: Decimal,
    /// The bonus paid when this is the highest tier reached.
    #[serde(alias = "amount")]
    pub bonus: Decimal,
}

/// Commission rate and the sales threshold it applies above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTerms {
    /// Commission rate, either a fraction (`0.1`) or a whole percentage (`10`).
    pub rate: Decimal,
    /// Sales below this earn no commission.
    #[serde(default)]
    pub threshold: Decimal,
}

/// A single block of a structured plan configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigBlock {
    /// Base salary, optionally carrying a tiered bonus table.
    BasicSalary {
        /// Base salary amount for the period.
        #[serde(alias = "base_salary", alias = "baseSalary")]
        amount: Decimal,
        /// Tiered bonus table.
        #[serde(default, alias = "tieredBonus", alias = "bonus_tiers")]
        tiered_bonus: Vec<BonusTier>,
    },
    /// Commission rate and threshold.
    Commission {
        /// Commission rate.
        rate: Decimal,
        /// Commission threshold.
        #[serde(default)]
        threshold: Decimal,
    },
    /// Any block type this engine does not interpret.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BlocksConfig {
    blocks: Vec<ConfigBlock>,
}

#[derive(Debug, Deserialize)]
struct LegacySalaryConfig {
    #[serde(default, alias = "baseSalary", alias = "basic_salary")]
    base_salary: Option<Decimal>,
    #[serde(default, alias = "commissionRate")]
    commission_rate: Option<Decimal>,
    #[serde(default, alias = "commissionThreshold")]
    commission_threshold: Option<Decimal>,
    #[serde(default, alias = "bonusTiers", alias = "tiered_bonus")]
    bonus_tiers: Vec<BonusTier>,
}

/// The salary components of a fixed or commission plan, whichever shape the
/// configuration used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryStructure {
    /// Base salary for the period.
    pub base_salary: Decimal,
    /// Tiered bonus table, sorted by ascending threshold.
    pub bonus_tiers: Vec<BonusTier>,
    /// Commission terms, when the plan has a commission component.
    pub commission: Option<CommissionTerms>,
}

impl SalaryStructure {
    /// Extracts the salary structure from a plan's configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the configuration is not an object,
    /// does not match either shape, or carries no base salary.
    pub fn from_plan(plan: &CompensationPlan) -> EngineResult<Self> {
        let Some(object) = plan.config.as_object() else {
            return Err(EngineError::configuration(
                &plan.id,
                "plan config must be an object",
            ));
        };

        let mut structure = if object.contains_key("blocks") {
            let config: BlocksConfig = parse_config(plan)?;
            Self::from_blocks(&plan.id, config.blocks)?
        } else {
            let legacy: LegacySalaryConfig = parse_config(plan)?;
            let base_salary = legacy.base_salary.ok_or_else(|| {
                EngineError::configuration(&plan.id, "missing base_salary in plan config")
            })?;
            Self {
                base_salary,
                bonus_tiers: legacy.bonus_tiers,
                commission: legacy.commission_rate.map(|rate| CommissionTerms {
                    rate,
                    threshold: legacy.commission_threshold.unwrap_or_default(),
                }),
            }
        };

        structure.bonus_tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        Ok(structure)
    }

    fn from_blocks(plan_id: &str, blocks: Vec<ConfigBlock>) -> EngineResult<Self> {
        let mut basic = None;
        let mut commission = None;
        for block in blocks {
            match block {
                ConfigBlock::BasicSalary {
                    amount,
                    tiered_bonus,
                } if basic.is_none() => basic = Some((amount, tiered_bonus)),
                ConfigBlock::Commission { rate, threshold } if commission.is_none() => {
                    commission = Some(CommissionTerms { rate, threshold })
                }
                _ => {}
            }
        }

        let (base_salary, bonus_tiers) = basic.ok_or_else(|| {
            EngineError::configuration(plan_id, "missing basic_salary block in plan config")
        })?;

        Ok(Self {
            base_salary,
            bonus_tiers,
            commission,
        })
    }
}

/// One sales bracket of a progressive commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBracket {
    /// Upper bound of the bracket's sales band.
    pub threshold: Decimal,
    /// Commission percentage applied to sales within the band (`5` = 5%).
    #[serde(alias = "pct", alias = "rate")]
    pub percentage: Decimal,
    /// Optional label used on detail lines.
    #[serde(default)]
    pub name: Option<String>,
}

/// Flat, all-or-nothing target bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBonus {
    /// Sales needed to unlock the bonus.
    pub threshold: Decimal,
    /// The bonus amount.
    #[serde(alias = "bonus")]
    pub amount: Decimal,
}

/// Configuration for the tiered commission calculator.
///
/// ```text
/// { "base_salary": 2000, "commission_threshold": 0,
///   "brackets": [ { "threshold": 5000, "percentage": 5, "name": "Bronze" },
///                 { "threshold": 10000, "percentage": 8 } ],
///   "target_bonus": { "threshold": 10000, "amount": 500 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredCommissionConfig {
    /// Base salary paid regardless of sales.
    #[serde(default, alias = "baseSalary")]
    pub base_salary: Decimal,
    /// Sales below this earn no commission at all.
    #[serde(default, alias = "commissionThreshold")]
    pub commission_threshold: Decimal,
    /// Sales brackets, sorted by ascending threshold after parsing.
    #[serde(alias = "tiers")]
    pub brackets: Vec<CommissionBracket>,
    /// Optional flat target bonus.
    #[serde(default, alias = "targetBonus")]
    pub target_bonus: Option<TargetBonus>,
}

impl TieredCommissionConfig {
    /// Extracts the tiered commission configuration from a plan.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the shape is wrong, there are no
    /// brackets, or a bracket has a negative percentage.
    pub fn from_plan(plan: &CompensationPlan) -> EngineResult<Self> {
        let mut config: Self = parse_config(plan)?;

        if config.brackets.is_empty() {
            return Err(EngineError::configuration(
                &plan.id,
                "tiered commission plan has no brackets",
            ));
        }
        if let Some(bracket) = config.brackets.iter().find(|b| b.percentage < Decimal::ZERO) {
            return Err(EngineError::configuration(
                &plan.id,
                format!(
                    "bracket at threshold {} has a negative percentage",
                    bracket.threshold
                ),
            ));
        }

        config.brackets.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        Ok(config)
    }
}

/// Deserializes a plan's config into `T`, mapping failures to
/// `ConfigurationError`.
pub(crate) fn parse_config<T: DeserializeOwned>(plan: &CompensationPlan) -> EngineResult<T> {
    parse_value(&plan.id, &plan.config)
}

pub(crate) fn parse_value<T: DeserializeOwned>(plan_id: &str, value: &Value) -> EngineResult<T> {
    T::deserialize(value).map_err(|e| EngineError::configuration(plan_id, e.to_string()))
}
