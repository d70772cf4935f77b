//! Calculation logic for the compensation engine.
//!
//! This module contains the [`Calculator`] strategy interface, one calculator
//! per plan kind (fixed salary, commission, tiered commission and formula),
//! the per-calculator result cache, and the registry that maps plan-type tags
//! onto calculators.

mod calculator;
mod commission;
mod fixed;
mod formula;
mod registry;
mod result_cache;
mod salary;
mod tiered_commission;

pub use calculator::Calculator;
pub use commission::CommissionCalculator;
pub use fixed::FixedCalculator;
pub use formula::FormulaCalculator;
pub use registry::{
    COMMISSION_TAGS, CalculatorRegistry, FIXED_TAGS, FORMULA_TAGS, RegistryBuilder,
    TIERED_COMMISSION_TAGS,
};
pub use result_cache::{CacheKey, CacheStats, ResultCache};
pub use tiered_commission::{BracketAllocation, TieredCommissionCalculator, allocate_brackets};
