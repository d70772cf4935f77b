//! The formula interpreter and its static validator.
//!
//! Both work over the [`FormulaPlan`](crate::models::FormulaPlan) data model.
//! The evaluator is the single interpreter used by the formula calculator and
//! by previews; the validator never executes anything.

mod evaluator;
mod memo;
mod validator;

pub use evaluator::{
    BASE_SALARY, BONUS_TOTAL, COMMISSION, DEDUCTIONS_TOTAL, EvaluationOutcome, FormulaEvaluator,
    LOANS_TOTAL, SALES_AMOUNT, TARGET_BONUS, VariableContext,
};
pub use validator::{
    ErrorType, FormulaValidator, ValidationError, ValidationReport, ValidationWarning,
    WarningType,
};
