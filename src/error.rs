//! Error types for the compensation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure a calculator, the formula interpreter, or the
//! configuration loader can produce.

use thiserror::Error;

/// The main error type for the compensation engine.
///
/// Calculators never hand these to their callers directly: they are folded
/// into a failed [`CalculationResult`](crate::models::CalculationResult) so a
/// single bad record cannot abort a batch. The typed form is still available
/// through the lower-level APIs.
///
/// # Example
///
/// ```
/// use compensation_engine::error::EngineError;
///
/// let error = EngineError::UnknownPlanType {
///     plan_type: "mystery".to_string(),
/// };
/// assert_eq!(error.to_string(), "Unknown plan type: mystery");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The plan configuration was missing or malformed.
    #[error("Invalid configuration for plan '{plan_id}': {message}")]
    ConfigurationError {
        /// The ID of the plan whose configuration is invalid.
        plan_id: String,
        /// A description of what is wrong.
        message: String,
    },

    /// A formula referenced a name that is not bound in the context.
    #[error("Undefined variable '{name}' referenced in step '{step_id}'")]
    UndefinedVariable {
        /// The unbound name.
        name: String,
        /// The step that referenced it.
        step_id: String,
    },

    /// A division had a zero divisor.
    #[error("Division by zero in step '{step_id}'")]
    DivisionByZero {
        /// The step performing the division.
        step_id: String,
    },

    /// A formula used an operator the interpreter does not know.
    #[error("Unsupported operator: {operator}")]
    UnsupportedOperator {
        /// The operator tag as written in the plan.
        operator: String,
    },

    /// An operator received the wrong number of parameters.
    #[error("Operator '{operator}' expects {expected} parameter(s), got {actual}")]
    InvalidArity {
        /// The operator tag.
        operator: String,
        /// Human-readable description of the accepted arity.
        expected: String,
        /// The number of parameters supplied.
        actual: usize,
    },

    /// No calculator is registered for the plan type tag.
    #[error("Unknown plan type: {plan_type}")]
    UnknownPlanType {
        /// The tag that was looked up.
        plan_type: String,
    },

    /// The formula's output variable was not bound after all steps ran.
    #[error("Output variable '{name}' was not produced by any step")]
    OutputVariableMissing {
        /// The configured output variable name.
        name: String,
    },

    /// Nested operators exceeded the configured depth limit.
    #[error("Nesting depth limit of {limit} exceeded in step '{step_id}'")]
    NestingTooDeep {
        /// The top-level step being evaluated.
        step_id: String,
        /// The configured limit.
        limit: usize,
    },

    /// A period identifier could not be parsed.
    #[error("Invalid period '{period}': {message}")]
    InvalidPeriod {
        /// The period identifier as supplied.
        period: String,
        /// A description of what is wrong.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Builds a [`EngineError::ConfigurationError`] for the given plan.
    pub fn configuration(plan_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ConfigurationError {
            plan_id: plan_id.into(),
            message: message.into(),
        }
    }

    /// Builds an overflow [`EngineError::CalculationError`].
    pub(crate) fn overflow(context: &str) -> Self {
        EngineError::CalculationError {
            message: format!("arithmetic overflow in {}", context),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
