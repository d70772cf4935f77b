//! The formula interpreter.
//!
//! A tree-walking evaluator over [`FormulaPlan`] steps. It is shared by the
//! formula calculator and by standalone previews, so what validates and what
//! executes use the same operator semantics.
//!
//! ## Semantics
//!
//! - Steps run strictly in declared order; each binds its `result` name.
//! - A name must be bound before it is referenced (`UndefinedVariable`).
//! - All parameters of an operator are evaluated before the operator is
//!   applied, including both branches of `if`.
//! - A zero divisor is always `DivisionByZero`.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::config::FormulaSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationRequest, ExecutionTrace, FormulaPlan, Operation, Operator, OperatorType,
    Parameter, TraceStep, VariableSource,
};

use super::memo::{MemoCache, MemoKey};

/// Variable bindings visible to formula steps.
pub type VariableContext = BTreeMap<String, Decimal>;

/// Context name seeded with the request's sales amount.
pub const SALES_AMOUNT: &str = "salesAmount";
/// Context name seeded with the period's bonus total.
pub const BONUS_TOTAL: &str = "bonusTotal";
/// Context name seeded with the period's deductions total.
pub const DEDUCTIONS_TOTAL: &str = "deductionsTotal";
/// Context name seeded with the period's loans total.
pub const LOANS_TOTAL: &str = "loansTotal";

/// Context name read into the result's base salary.
pub const BASE_SALARY: &str = "baseSalary";
/// Context name read into the result's commission.
pub const COMMISSION: &str = "commission";
/// Context name read into the result's target bonus.
pub const TARGET_BONUS: &str = "targetBonus";

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// The outcome of evaluating a formula.
///
/// Never an `Err`: failures are reported with `success == false`, a zero
/// result, the trace of the steps that did complete, and the error.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// Whether every step ran and the output variable was bound.
    pub success: bool,
    /// The value of the output variable, or zero on failure.
    pub result: Decimal,
    /// The final variable context.
    pub variables: VariableContext,
    /// Per-step execution trace.
    pub trace: ExecutionTrace,
    /// The failure, when `success` is false.
    pub error: Option<EngineError>,
}

impl EvaluationOutcome {
    /// Returns a context value, or zero when the name is unbound.
    pub fn value_or_zero(&self, name: &str) -> Decimal {
        self.variables.get(name).copied().unwrap_or_default()
    }

    /// Returns the failure message, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Evaluates formula plans.
///
/// The evaluator itself holds only limits; all per-run state (context,
/// memoization cache, trace) is created inside [`FormulaEvaluator::evaluate`].
///
/// # Example
///
/// ```
/// use compensation_engine::formula::FormulaEvaluator;
/// use compensation_engine::models::{
///     FormulaPlan, Operation, OperatorType, Parameter, Step, Variable,
/// };
/// use rust_decimal::Decimal;
///
/// let plan = FormulaPlan {
///     variables: vec![Variable::constant("a", Decimal::from(2))],
///     steps: vec![Step::new(
///         "s1",
///         "Sum",
///         Operation::op(OperatorType::Add, vec![Parameter::var("a"), Parameter::lit(3)]),
///         "total",
///     )],
///     output_variable: "total".to_string(),
/// };
///
/// let evaluator = FormulaEvaluator::default();
/// let outcome = evaluator.evaluate(&plan, FormulaEvaluator::default_context(&plan));
/// assert!(outcome.success);
/// assert_eq!(outcome.result, Decimal::from(5));
/// ```
#[derive(Debug, Clone)]
pub struct FormulaEvaluator {
    max_nesting_depth: usize,
}

impl Default for FormulaEvaluator {
    fn default() -> Self {
        Self::new(&FormulaSettings::default())
    }
}

impl FormulaEvaluator {
    /// Creates an evaluator with the given limits.
    pub fn new(settings: &FormulaSettings) -> Self {
        Self {
            max_nesting_depth: settings.max_nesting_depth,
        }
    }

    /// Builds the initial context for a calculation request.
    ///
    /// Seeds the sales amount and transaction totals under fixed names, then
    /// binds each declared variable from its source. Declared variables win
    /// over seeded names.
    ///
    /// # Errors
    ///
    /// Returns `CalculationError` if a transaction total overflows.
    pub fn request_context(
        plan: &FormulaPlan,
        request: &CalculationRequest,
    ) -> EngineResult<VariableContext> {
        let mut context = seeded_context(
            request.sales_amount,
            request.bonus_total()?,
            request.deductions_total()?,
            request.loans_total()?,
        );

        for variable in &plan.variables {
            let value = match &variable.source {
                VariableSource::Constant => variable.default_value,
                VariableSource::SalesAmount => request.sales_amount,
                VariableSource::EmployeeAttribute { path } => request
                    .employee
                    .attribute(path)
                    .unwrap_or(variable.default_value),
            };
            context.insert(variable.name.clone(), value);
        }
        Ok(context)
    }

    /// Builds a context binding every declared variable to its default value.
    ///
    /// Used for previews where no employee or sales figure is available.
    pub fn default_context(plan: &FormulaPlan) -> VariableContext {
        plan.variables
            .iter()
            .map(|v| (v.name.clone(), v.default_value))
            .collect()
    }

    /// Runs `plan` and returns the typed error instead of a failed outcome.
    pub fn run(
        &self,
        plan: &FormulaPlan,
        context: VariableContext,
    ) -> EngineResult<EvaluationOutcome> {
        let outcome = self.evaluate(plan, context);
        match outcome.error.clone() {
            Some(error) => Err(error),
            None => Ok(outcome),
        }
    }

    /// Evaluates `plan` against its declared defaults with an explicit sales
    /// figure, without an employee. Used to preview a plan before activation.
    ///
    /// The seeded names are bound as for a request with no transactions.
    pub fn preview(&self, plan: &FormulaPlan, sales: Decimal) -> EngineResult<Decimal> {
        let mut context = seeded_context(sales, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        for variable in &plan.variables {
            let value = match &variable.source {
                VariableSource::SalesAmount => sales,
                _ => variable.default_value,
            };
            context.insert(variable.name.clone(), value);
        }
        self.run(plan, context).map(|outcome| outcome.result)
    }

    /// Runs every step of `plan` against `context`.
    pub fn evaluate(&self, plan: &FormulaPlan, context: VariableContext) -> EvaluationOutcome {
        let started = Instant::now();
        let mut trace = ExecutionTrace::new();
        let mut interpreter = Interpreter {
            context,
            memo: MemoCache::new(),
            max_depth: self.max_nesting_depth,
        };

        let outcome = interpreter.run(plan, &mut trace);
        trace.cache_hits = interpreter.memo.hits();
        trace.duration_us = started.elapsed().as_micros() as u64;

        debug!(
            evaluation_id = %trace.evaluation_id,
            steps = trace.steps.len(),
            cache_hits = trace.cache_hits,
            duration_us = trace.duration_us,
            success = outcome.is_ok(),
            "Formula evaluated"
        );

        match outcome {
            Ok(result) => EvaluationOutcome {
                success: true,
                result,
                variables: interpreter.context,
                trace,
                error: None,
            },
            Err(error) => EvaluationOutcome {
                success: false,
                result: Decimal::ZERO,
                variables: interpreter.context,
                trace,
                error: Some(error),
            },
        }
    }
}

/// Binds the names every formula may reference without declaring them.
fn seeded_context(
    sales: Decimal,
    bonuses: Decimal,
    deductions: Decimal,
    loans: Decimal,
) -> VariableContext {
    VariableContext::from([
        (SALES_AMOUNT.to_string(), sales),
        (BONUS_TOTAL.to_string(), bonuses),
        (DEDUCTIONS_TOTAL.to_string(), deductions),
        (LOANS_TOTAL.to_string(), loans),
    ])
}

/// Memo keys for an operator and its nested operators, built once per step.
///
/// `nested[i]` is set when parameter `i` is a nested operator.
struct KeyTree {
    key: Option<String>,
    nested: Vec<Option<KeyTree>>,
}

/// Per-evaluation interpreter state.
struct Interpreter {
    context: VariableContext,
    memo: MemoCache,
    max_depth: usize,
}

impl Interpreter {
    fn run(&mut self, plan: &FormulaPlan, trace: &mut ExecutionTrace) -> EngineResult<Decimal> {
        for (index, step) in plan.steps.iter().enumerate() {
            let started = Instant::now();
            let inputs = self.describe_inputs(&step.operation);
            let value = self.eval_operation(&step.operation, &step.id)?;
            self.context.insert(step.result.clone(), value);

            trace.steps.push(TraceStep {
                step_number: index as u32 + 1,
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                inputs,
                result: value,
                variable: step.result.clone(),
                duration_us: started.elapsed().as_micros() as u64,
            });
        }

        self.context
            .get(&plan.output_variable)
            .copied()
            .ok_or_else(|| EngineError::OutputVariableMissing {
                name: plan.output_variable.clone(),
            })
    }

    fn eval_operation(&mut self, operation: &Operation, step_id: &str) -> EngineResult<Decimal> {
        match operation {
            Operation::Literal(value) => Ok(*value),
            Operation::Reference(name) => self.resolve(name, step_id),
            Operation::Operator(operator) => {
                let keys = self.key_tree(operator, step_id, 0)?;
                self.eval_operator(operator, &keys, step_id)
            }
        }
    }

    fn eval_operator(
        &mut self,
        operator: &Operator,
        keys: &KeyTree,
        step_id: &str,
    ) -> EngineResult<Decimal> {
        check_arity(operator)?;

        if let Some(key) = &keys.key {
            if let Some(value) = self.memo.get(key) {
                trace!(key = %key, "Memoized operator result reused");
                return Ok(value);
            }
        }

        // Eager: every parameter is evaluated, whatever the operator.
        let values = operator
            .parameters
            .iter()
            .zip(&keys.nested)
            .map(|(parameter, nested_keys)| match parameter {
                Parameter::Literal(value) => Ok(*value),
                Parameter::Reference(name) => self.resolve(name, step_id),
                Parameter::Step(nested) => match (&nested.operation, nested_keys) {
                    (Operation::Operator(inner), Some(inner_keys)) => {
                        self.eval_operator(inner, inner_keys, step_id)
                    }
                    (operation, _) => self.eval_operation(operation, step_id),
                },
            })
            .collect::<EngineResult<Vec<Decimal>>>()?;

        let value = apply(&operator.op_type, &values, step_id)?;
        if let Some(key) = &keys.key {
            self.memo.insert(key.clone(), value);
        }
        Ok(value)
    }

    /// Resolves a name against the context, accepting numeric text as a literal.
    fn resolve(&self, name: &str, step_id: &str) -> EngineResult<Decimal> {
        if let Some(value) = self.context.get(name) {
            return Ok(*value);
        }
        Decimal::from_str(name.trim()).map_err(|_| EngineError::UndefinedVariable {
            name: name.to_string(),
            step_id: step_id.to_string(),
        })
    }

    /// Builds the memo keys of `operator` and every operator nested in it,
    /// bottom-up in one pass. Fails once `depth` passes the nesting limit.
    fn key_tree(&self, operator: &Operator, step_id: &str, depth: usize) -> EngineResult<KeyTree> {
        if depth > self.max_depth {
            return Err(EngineError::NestingTooDeep {
                step_id: step_id.to_string(),
                limit: self.max_depth,
            });
        }

        let mut key = MemoKey::new(operator.op_type.as_str());
        let mut nested_keys = Vec::with_capacity(operator.parameters.len());
        for parameter in &operator.parameters {
            match parameter {
                Parameter::Literal(value) => {
                    key.literal(*value);
                    nested_keys.push(None);
                }
                Parameter::Reference(name) => {
                    key.variable(name, self.resolve(name, step_id)?);
                    nested_keys.push(None);
                }
                Parameter::Step(nested) => match &nested.operation {
                    Operation::Operator(inner) => {
                        let tree = self.key_tree(inner, step_id, depth + 1)?;
                        key.nested(&nested.id, tree.key.clone());
                        nested_keys.push(Some(tree));
                    }
                    Operation::Literal(value) => {
                        let mut inner = MemoKey::new("literal");
                        inner.literal(*value);
                        key.nested(&nested.id, inner.finish());
                        nested_keys.push(None);
                    }
                    Operation::Reference(name) => {
                        let mut inner = MemoKey::new("reference");
                        inner.variable(name, self.resolve(name, step_id)?);
                        key.nested(&nested.id, inner.finish());
                        nested_keys.push(None);
                    }
                },
            }
        }

        Ok(KeyTree {
            key: key.finish(),
            nested: nested_keys,
        })
    }

    /// Describes a step's direct inputs for the trace without evaluating
    /// nested expressions.
    fn describe_inputs(&self, operation: &Operation) -> Value {
        let describe_reference = |name: &str| match self.context.get(name) {
            Some(value) => json!({ "variable": name, "value": value.to_string() }),
            None => json!({ "variable": name }),
        };

        match operation {
            Operation::Literal(value) => json!([{ "literal": value.to_string() }]),
            Operation::Reference(name) => Value::Array(vec![describe_reference(name)]),
            Operation::Operator(operator) => Value::Array(
                operator
                    .parameters
                    .iter()
                    .map(|p| match p {
                        Parameter::Literal(value) => json!({ "literal": value.to_string() }),
                        Parameter::Reference(name) => describe_reference(name),
                        Parameter::Step(nested) => {
                            let kind = match &nested.operation {
                                Operation::Operator(op) => op.op_type.as_str(),
                                Operation::Literal(_) => "literal",
                                Operation::Reference(_) => "reference",
                            };
                            json!({ "expression": nested.id, "operator": kind })
                        }
                    })
                    .collect(),
            ),
        }
    }
}

/// Fails on unsupported operators and on arity violations.
///
/// `add`, `subtract` and `multiply` fold with their identity, so an empty
/// parameter list is tolerated at runtime.
fn check_arity(operator: &Operator) -> EngineResult<()> {
    let Some(arity) = operator.op_type.arity() else {
        return Err(EngineError::UnsupportedOperator {
            operator: operator.op_type.to_string(),
        });
    };
    let folds = matches!(
        operator.op_type,
        OperatorType::Add | OperatorType::Subtract | OperatorType::Multiply
    );
    if !folds && !arity.accepts(operator.parameters.len()) {
        return Err(EngineError::InvalidArity {
            operator: operator.op_type.to_string(),
            expected: arity.to_string(),
            actual: operator.parameters.len(),
        });
    }
    Ok(())
}

fn truth(value: bool) -> Decimal {
    if value { Decimal::ONE } else { Decimal::ZERO }
}

fn checked_sum(values: &[Decimal], op: &str) -> EngineResult<Decimal> {
    values.iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(*v).ok_or_else(|| EngineError::overflow(op))
    })
}

/// Applies an operator to already-evaluated parameters.
fn apply(op_type: &OperatorType, values: &[Decimal], step_id: &str) -> EngineResult<Decimal> {
    use OperatorType::*;

    let op = op_type.as_str();
    Ok(match op_type {
        Add => checked_sum(values, op)?,
        Subtract => match values.split_first() {
            Some((first, rest)) => first
                .checked_sub(checked_sum(rest, op)?)
                .ok_or_else(|| EngineError::overflow(op))?,
            None => Decimal::ZERO,
        },
        Multiply => values.iter().try_fold(Decimal::ONE, |acc, v| {
            acc.checked_mul(*v).ok_or_else(|| EngineError::overflow(op))
        })?,
        Divide => {
            if values[1].is_zero() {
                return Err(EngineError::DivisionByZero {
                    step_id: step_id.to_string(),
                });
            }
            values[0]
                .checked_div(values[1])
                .ok_or_else(|| EngineError::overflow(op))?
        }
        If => {
            if values[0].is_zero() {
                values[2]
            } else {
                values[1]
            }
        }
        Min => values.iter().copied().min().unwrap_or_default(),
        Max => values.iter().copied().max().unwrap_or_default(),
        Equal => truth(values[0] == values[1]),
        NotEqual => truth(values[0] != values[1]),
        GreaterThan => truth(values[0] > values[1]),
        LessThan => truth(values[0] < values[1]),
        GreaterThanOrEqual => truth(values[0] >= values[1]),
        LessThanOrEqual => truth(values[0] <= values[1]),
        And => truth(values.iter().all(|v| !v.is_zero())),
        Or => truth(values.iter().any(|v| !v.is_zero())),
        Not => truth(values[0].is_zero()),
        Percent => values[0] / HUNDRED,
        Round => values[0].round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        Abs => values[0].abs(),
        Unsupported(tag) => {
            return Err(EngineError::UnsupportedOperator {
                operator: tag.clone(),
            });
        }
    })
}
