//! Core data models for the compensation engine.
//!
//! This module contains the plan, formula, transaction, request, and result
//! types. They carry no calculation behavior beyond parsing and small helpers.

mod calculation_result;
mod employee;
mod formula;
mod pay_period;
mod plan;
mod plan_config;
mod request;
mod trace;
mod transaction;

pub use calculation_result::{CalculationResult, DetailLine, DetailType, Earnings};
pub use employee::EmployeeSnapshot;
pub use formula::{
    Arity, FormulaPlan, Operation, Operator, OperatorType, Parameter, Step, Variable,
    VariableSource,
};
pub use pay_period::PayPeriod;
pub use plan::{CompensationPlan, PlanKind};
pub use plan_config::{
    BonusTier, CommissionBracket, CommissionTerms, ConfigBlock, SalaryStructure, TargetBonus,
    TieredCommissionConfig,
};
pub use request::CalculationRequest;
pub use trace::{ExecutionTrace, TraceStep};
pub use transaction::Transaction;
