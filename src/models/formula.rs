//! Formula plan model: variables, ordered steps, and operator trees.
//!
//! A formula plan is plain data. It is executed by
//! [`FormulaEvaluator`](crate::formula::FormulaEvaluator) and checked ahead of
//! activation by [`FormulaValidator`](crate::formula::FormulaValidator).
//!
//! ```text
//! {
//!   "variables": [ { "name": "sales", "source": { "type": "salesAmount" } } ],
//!   "steps": [
//!     { "id": "s1", "name": "Commission", "result": "commission",
//!       "operation": { "type": "multiply", "parameters": [ "sales", "0.05" ] } }
//!   ],
//!   "outputVariable": "commission"
//! }
//! ```

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

use super::CompensationPlan;
use super::plan_config::parse_config;

/// A declarative formula: variables, ordered steps, and the name of the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaPlan {
    /// Declared input variables, bound before any step runs.
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Steps, executed strictly in declared order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// The name whose value is the formula's answer.
    #[serde(default)]
    pub output_variable: String,
}

impl FormulaPlan {
    /// Extracts the formula from a formula-based plan's configuration.
    ///
    /// Accepts the formula directly as the config, or nested under a
    /// `"formula"` key.
    pub fn from_plan(plan: &CompensationPlan) -> EngineResult<Self> {
        match plan.config.get("formula") {
            Some(inner) => super::plan_config::parse_value(&plan.id, inner),
            None => parse_config(plan),
        }
    }

    /// Returns the top-level step whose result is the output variable.
    pub fn output_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.result == self.output_variable)
    }
}

/// Where a variable's initial value comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VariableSource {
    /// The declared default value.
    #[default]
    Constant,
    /// A numeric property of the employee snapshot, read by dot-path.
    EmployeeAttribute {
        /// Dot-separated attribute path, e.g. `profile.yearsOfService`.
        path: String,
    },
    /// The request's sales amount for the period.
    SalesAmount,
}

/// A declared formula input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// The name steps use to reference this variable.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Value used for constants, and as the fallback for missing attributes.
    #[serde(default)]
    pub default_value: Decimal,
    /// Where the value comes from.
    #[serde(default)]
    pub source: VariableSource,
}

impl Variable {
    /// Creates a constant variable.
    pub fn constant(name: impl Into<String>, value: Decimal) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default_value: value,
            source: VariableSource::Constant,
        }
    }

    /// Creates a variable bound to the period's sales amount.
    pub fn sales(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default_value: Decimal::ZERO,
            source: VariableSource::SalesAmount,
        }
    }

    /// Creates a variable read from an employee attribute.
    pub fn attribute(name: impl Into<String>, path: impl Into<String>, fallback: Decimal) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default_value: fallback,
            source: VariableSource::EmployeeAttribute { path: path.into() },
        }
    }
}

/// One named computation in a formula.
///
/// Nested steps (used as operator parameters) may leave `name` and `result`
/// empty; top-level steps must set both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier for the step.
    #[serde(default)]
    pub id: String,
    /// Human-readable step name.
    #[serde(default)]
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// What the step computes.
    pub operation: Operation,
    /// The name the step's value is bound to.
    #[serde(default)]
    pub result: String,
}

impl Step {
    /// Creates a step.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        operation: Operation,
        result: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            operation,
            result: result.into(),
        }
    }
}

/// The body of a step.
///
/// Strings that parse as numbers are literals; any other string is a
/// variable reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operation {
    /// A numeric literal.
    Literal(Decimal),
    /// An operator over parameters.
    Operator(Operator),
    /// A reference to a variable or earlier step result.
    Reference(String),
}

impl Operation {
    /// Shorthand for an operator operation.
    pub fn op(op_type: OperatorType, parameters: Vec<Parameter>) -> Self {
        Operation::Operator(Operator {
            op_type,
            parameters,
        })
    }
}

/// An operator applied to an ordered parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// The operator type.
    #[serde(rename = "type")]
    pub op_type: OperatorType,
    /// Ordered parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A single operator parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    /// A numeric literal.
    Literal(Decimal),
    /// A nested sub-expression.
    Step(Box<Step>),
    /// A reference to a variable or earlier step result.
    Reference(String),
}

impl Parameter {
    /// Shorthand for a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Parameter::Reference(name.into())
    }

    /// Shorthand for a literal.
    pub fn lit(value: impl Into<Decimal>) -> Self {
        Parameter::Literal(value.into())
    }

    /// Shorthand for a nested operator with a generated step wrapper.
    pub fn nested(
        id: impl Into<String>,
        op_type: OperatorType,
        parameters: Vec<Parameter>,
    ) -> Self {
        Parameter::Step(Box::new(Step::new(
            id,
            "",
            Operation::op(op_type, parameters),
            "",
        )))
    }
}

/// How many parameters an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// This many or more.
    AtLeast(usize),
}

impl Arity {
    /// Returns true if `count` parameters are acceptable.
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// The operator set understood by the interpreter.
///
/// Unknown tags are preserved as [`OperatorType::Unsupported`] so that a plan
/// with a typo still deserializes and can be reported precisely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperatorType {
    /// Sum of all parameters.
    Add,
    /// First parameter minus the sum of the rest.
    Subtract,
    /// Product of all parameters.
    Multiply,
    /// First parameter divided by the second.
    Divide,
    /// Condition, then-value, else-value.
    If,
    /// Smallest parameter.
    Min,
    /// Largest parameter.
    Max,
    /// 1 if equal, else 0.
    Equal,
    /// 1 if not equal, else 0.
    NotEqual,
    /// 1 if first > second, else 0.
    GreaterThan,
    /// 1 if first < second, else 0.
    LessThan,
    /// 1 if first >= second, else 0.
    GreaterThanOrEqual,
    /// 1 if first <= second, else 0.
    LessThanOrEqual,
    /// 1 if every parameter is non-zero, else 0.
    And,
    /// 1 if any parameter is non-zero, else 0.
    Or,
    /// 1 if the parameter is zero, else 0.
    Not,
    /// The parameter divided by 100.
    Percent,
    /// The parameter rounded half away from zero to a whole number.
    Round,
    /// Absolute value.
    Abs,
    /// A tag the interpreter does not know.
    Unsupported(String),
}

impl OperatorType {
    /// Returns the serialized tag.
    pub fn as_str(&self) -> &str {
        match self {
            OperatorType::Add => "add",
            OperatorType::Subtract => "subtract",
            OperatorType::Multiply => "multiply",
            OperatorType::Divide => "divide",
            OperatorType::If => "if",
            OperatorType::Min => "min",
            OperatorType::Max => "max",
            OperatorType::Equal => "equal",
            OperatorType::NotEqual => "notEqual",
            OperatorType::GreaterThan => "greaterThan",
            OperatorType::LessThan => "lessThan",
            OperatorType::GreaterThanOrEqual => "greaterThanOrEqual",
            OperatorType::LessThanOrEqual => "lessThanOrEqual",
            OperatorType::And => "and",
            OperatorType::Or => "or",
            OperatorType::Not => "not",
            OperatorType::Percent => "percent",
            OperatorType::Round => "round",
            OperatorType::Abs => "abs",
            OperatorType::Unsupported(tag) => tag,
        }
    }

    /// Returns the accepted parameter count, or `None` for unsupported tags.
    pub fn arity(&self) -> Option<Arity> {
        use OperatorType::*;
        Some(match self {
            Add | Subtract | Multiply | Min | Max => Arity::AtLeast(1),
            And | Or => Arity::AtLeast(2),
            Divide | Equal | NotEqual | GreaterThan | LessThan | GreaterThanOrEqual
            | LessThanOrEqual => Arity::Exact(2),
            If => Arity::Exact(3),
            Not | Percent | Round | Abs => Arity::Exact(1),
            Unsupported(_) => return None,
        })
    }
}

impl From<String> for OperatorType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "add" => OperatorType::Add,
            "subtract" => OperatorType::Subtract,
            "multiply" => OperatorType::Multiply,
            "divide" => OperatorType::Divide,
            "if" | "conditional" => OperatorType::If,
            "min" => OperatorType::Min,
            "max" => OperatorType::Max,
            "equal" => OperatorType::Equal,
            "notEqual" => OperatorType::NotEqual,
            "greaterThan" => OperatorType::GreaterThan,
            "lessThan" => OperatorType::LessThan,
            "greaterThanOrEqual" => OperatorType::GreaterThanOrEqual,
            "lessThanOrEqual" => OperatorType::LessThanOrEqual,
            "and" => OperatorType::And,
            "or" => OperatorType::Or,
            "not" => OperatorType::Not,
            "percent" => OperatorType::Percent,
            "round" => OperatorType::Round,
            "abs" => OperatorType::Abs,
            _ => OperatorType::Unsupported(tag),
        }
    }
}

impl From<OperatorType> for String {
    fn from(op: OperatorType) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
