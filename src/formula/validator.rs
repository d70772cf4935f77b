//! Static pre-flight analysis of formula plans.
//!
//! Runs before a formula-based plan is activated, independently of the
//! evaluator. Errors gate activation; warnings are advisory.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FormulaSettings;
use crate::models::{CompensationPlan, FormulaPlan, Operation, OperatorType, Parameter, Step};

use super::evaluator::{BONUS_TOTAL, DEDUCTIONS_TOTAL, LOANS_TOTAL, SALES_AMOUNT};

/// Names bound by the engine before any declared variable.
const SEEDED_NAMES: [&str; 4] = [SALES_AMOUNT, BONUS_TOTAL, DEDUCTIONS_TOTAL, LOANS_TOTAL];

/// Category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Unknown operator or wrong parameter count.
    Syntax,
    /// Reference to a name that is not bound at that point.
    Variable,
    /// Malformed step.
    Step,
    /// Plan-level shape problem, including circular dependencies.
    Structure,
    /// A computation that can never succeed, such as dividing by literal zero.
    Logic,
}

/// Category of a validation warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    /// The plan is unusually large.
    Performance,
    /// Something declared but never used.
    Logic,
    /// Something that may fail at runtime depending on inputs.
    PotentialError,
}

/// A hard validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// The error category.
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    /// Human-readable message.
    pub message: String,
    /// The top-level step the error was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// The variable involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Zero-based position of the offending parameter within its operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_index: Option<usize>,
}

/// An advisory finding that does not block activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    /// The warning category.
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    /// Human-readable message.
    pub message: String,
    /// The top-level step the warning was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// The variable involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Zero-based position of the offending parameter within its operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_index: Option<usize>,
}

/// The outcome of validating a formula plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True when there are no errors.
    pub is_valid: bool,
    /// Hard errors.
    pub errors: Vec<ValidationError>,
    /// Advisory warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    fn error(&mut self, error_type: ErrorType, message: impl Into<String>) -> &mut ValidationError {
        self.errors.push(ValidationError {
            error_type,
            message: message.into(),
            step_id: None,
            variable: None,
            parameter_index: None,
        });
        let last = self.errors.len() - 1;
        &mut self.errors[last]
    }

    fn warning(
        &mut self,
        warning_type: WarningType,
        message: impl Into<String>,
    ) -> &mut ValidationWarning {
        self.warnings.push(ValidationWarning {
            warning_type,
            message: message.into(),
            step_id: None,
            variable: None,
            parameter_index: None,
        });
        let last = self.warnings.len() - 1;
        &mut self.warnings[last]
    }

    /// Returns true if any error has the given type.
    pub fn has_error(&self, error_type: ErrorType) -> bool {
        self.errors.iter().any(|e| e.error_type == error_type)
    }

    /// Returns true if any warning has the given type.
    pub fn has_warning(&self, warning_type: WarningType) -> bool {
        self.warnings.iter().any(|w| w.warning_type == warning_type)
    }
}

/// Validates formula plans.
///
/// # Example
///
/// ```
/// use compensation_engine::formula::FormulaValidator;
/// use compensation_engine::models::{FormulaPlan, Operation, OperatorType, Parameter, Step};
///
/// let plan = FormulaPlan {
///     variables: vec![],
///     steps: vec![Step::new(
///         "s1",
///         "Sum",
///         Operation::op(OperatorType::Add, vec![Parameter::lit(2), Parameter::lit(3)]),
///         "total",
///     )],
///     output_variable: "total".to_string(),
/// };
///
/// let report = FormulaValidator::default().validate(&plan);
/// assert!(report.is_valid);
/// assert!(report.errors.is_empty() && report.warnings.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct FormulaValidator {
    max_nesting_depth: usize,
    max_steps_warning: usize,
}

impl Default for FormulaValidator {
    fn default() -> Self {
        Self::new(&FormulaSettings::default())
    }
}

impl FormulaValidator {
    /// Creates a validator with the given limits.
    pub fn new(settings: &FormulaSettings) -> Self {
        Self {
            max_nesting_depth: settings.max_nesting_depth,
            max_steps_warning: settings.max_steps_warning,
        }
    }

    /// Parses and validates the formula carried by a plan's configuration.
    ///
    /// A configuration that does not parse as a formula is a single
    /// `syntax` error.
    pub fn validate_plan(&self, plan: &CompensationPlan) -> ValidationReport {
        match FormulaPlan::from_plan(plan) {
            Ok(formula) => self.validate(&formula),
            Err(e) => {
                let mut report = ValidationReport::default();
                report.error(ErrorType::Syntax, e.to_string());
                report
            }
        }
    }

    /// Runs every check against `plan`.
    pub fn validate(&self, plan: &FormulaPlan) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_structure(plan, &mut report);
        self.check_steps(plan, &mut report);
        check_cycles(plan, &mut report);
        check_unused_variables(plan, &mut report);

        if plan.steps.len() > self.max_steps_warning {
            report.warning(
                WarningType::Performance,
                format!(
                    "Formula has {} steps, more than the recommended {}",
                    plan.steps.len(),
                    self.max_steps_warning
                ),
            );
        }

        report.is_valid = report.errors.is_empty();
        debug!(
            steps = plan.steps.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Formula validated"
        );
        report
    }

    fn check_structure(&self, plan: &FormulaPlan, report: &mut ValidationReport) {
        if plan.steps.is_empty() {
            report.error(ErrorType::Structure, "Formula must have at least one step");
        }

        let mut seen_ids = HashSet::new();
        for (index, step) in plan.steps.iter().enumerate() {
            let label = if step.id.is_empty() {
                format!("#{}", index + 1)
            } else {
                step.id.clone()
            };
            for (field, value) in [("id", &step.id), ("name", &step.name), ("result", &step.result)]
            {
                if value.trim().is_empty() {
                    report.error(ErrorType::Step, format!("Step {} is missing a {}", label, field))
                        .step_id = Some(label.clone());
                }
            }
            if !step.id.is_empty() && !seen_ids.insert(step.id.as_str()) {
                report.error(ErrorType::Step, format!("Duplicate step id '{}'", step.id))
                    .step_id = Some(step.id.clone());
            }
        }

        if plan.output_variable.is_empty() {
            report.error(ErrorType::Structure, "Formula has no output variable");
        } else if plan.output_step().is_none() {
            let error = report.error(
                ErrorType::Structure,
                format!(
                    "Output variable '{}' is not produced by any step",
                    plan.output_variable
                ),
            );
            error.variable = Some(plan.output_variable.clone());
        }
    }

    /// Variable existence, arity, division safety and nesting depth, walking
    /// steps in declared order.
    fn check_steps(&self, plan: &FormulaPlan, report: &mut ValidationReport) {
        let mut bound: HashSet<&str> = SEEDED_NAMES.into_iter().collect();
        bound.extend(plan.variables.iter().map(|v| v.name.as_str()));

        for step in &plan.steps {
            let mut walk = StepWalk {
                step_id: &step.id,
                bound: &bound,
                max_depth: self.max_nesting_depth,
                depth_reported: false,
                report: &mut *report,
            };
            walk.operation(&step.operation, 0);
            if !step.result.is_empty() {
                bound.insert(step.result.as_str());
            }
        }
    }
}

/// Checks within a single top-level step.
struct StepWalk<'a> {
    step_id: &'a str,
    bound: &'a HashSet<&'a str>,
    max_depth: usize,
    depth_reported: bool,
    report: &'a mut ValidationReport,
}

impl StepWalk<'_> {
    fn operation(&mut self, operation: &Operation, depth: usize) {
        match operation {
            Operation::Literal(_) => {}
            Operation::Reference(name) => self.reference(name, None),
            Operation::Operator(operator) => {
                if depth > self.max_depth {
                    if !self.depth_reported {
                        self.depth_reported = true;
                        self.report
                            .error(
                                ErrorType::Structure,
                                format!(
                                    "Nesting depth limit of {} exceeded in step '{}'",
                                    self.max_depth, self.step_id
                                ),
                            )
                            .step_id = Some(self.step_id.to_string());
                    }
                    return;
                }

                self.operator(&operator.op_type, &operator.parameters);
                for (index, parameter) in operator.parameters.iter().enumerate() {
                    match parameter {
                        Parameter::Literal(_) => {}
                        Parameter::Reference(name) => self.reference(name, Some(index)),
                        Parameter::Step(nested) => self.operation(&nested.operation, depth + 1),
                    }
                }
            }
        }
    }

    fn operator(&mut self, op_type: &OperatorType, parameters: &[Parameter]) {
        let step_id = Some(self.step_id.to_string());

        let Some(arity) = op_type.arity() else {
            self.report
                .error(ErrorType::Syntax, format!("Unsupported operator '{}'", op_type))
                .step_id = step_id;
            return;
        };
        if !arity.accepts(parameters.len()) {
            self.report
                .error(
                    ErrorType::Syntax,
                    format!(
                        "Operator '{}' expects {} parameter(s), got {}",
                        op_type,
                        arity,
                        parameters.len()
                    ),
                )
                .step_id = step_id;
            return;
        }

        if *op_type == OperatorType::Divide {
            match &parameters[1] {
                divisor if literal_value(divisor).is_some_and(|v| v.is_zero()) => {
                    let error = self.report.error(
                        ErrorType::Logic,
                        format!("Division by zero in step '{}'", self.step_id),
                    );
                    error.step_id = step_id;
                    error.parameter_index = Some(1);
                }
                Parameter::Reference(name) if literal_value(&parameters[1]).is_none() => {
                    let warning = self.report.warning(
                        WarningType::PotentialError,
                        format!("Divisor '{}' may be zero at runtime", name),
                    );
                    warning.step_id = step_id;
                    warning.variable = Some(name.clone());
                    warning.parameter_index = Some(1);
                }
                _ => {}
            }
        }
    }

    fn reference(&mut self, name: &str, parameter_index: Option<usize>) {
        if is_numeric(name) || self.bound.contains(name) {
            return;
        }
        let error = self.report.error(
            ErrorType::Variable,
            format!(
                "Undefined variable '{}' referenced in step '{}'",
                name, self.step_id
            ),
        );
        error.step_id = Some(self.step_id.to_string());
        error.variable = Some(name.to_string());
        error.parameter_index = parameter_index;
    }
}

fn is_numeric(name: &str) -> bool {
    Decimal::from_str(name.trim()).is_ok()
}

/// The value of a parameter known statically, if any.
fn literal_value(parameter: &Parameter) -> Option<Decimal> {
    match parameter {
        Parameter::Literal(value) => Some(*value),
        Parameter::Reference(name) => Decimal::from_str(name.trim()).ok(),
        Parameter::Step(_) => None,
    }
}

/// Collects every name referenced by an operation, recursing into nested
/// operators.
fn collect_refs<'a>(operation: &'a Operation, out: &mut Vec<&'a str>) {
    match operation {
        Operation::Literal(_) => {}
        Operation::Reference(name) => out.push(name),
        Operation::Operator(operator) => {
            for parameter in &operator.parameters {
                match parameter {
                    Parameter::Literal(_) => {}
                    Parameter::Reference(name) => out.push(name),
                    Parameter::Step(nested) => collect_refs(&nested.operation, out),
                }
            }
        }
    }
}

/// Detects cycles between step results.
///
/// Each step's result depends on every step result it references. Names bound
/// before the first step (declared variables and seeded names) are not
/// dependencies, so rebinding a declared variable is not a cycle.
fn check_cycles(plan: &FormulaPlan, report: &mut ValidationReport) {
    let initial: HashSet<&str> = SEEDED_NAMES
        .into_iter()
        .chain(plan.variables.iter().map(|v| v.name.as_str()))
        .collect();

    let mut producers: HashMap<&str, &Step> = HashMap::new();
    for step in &plan.steps {
        if !step.result.is_empty() {
            producers.entry(step.result.as_str()).or_insert(step);
        }
    }

    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in &plan.steps {
        if step.result.is_empty() {
            continue;
        }
        let mut refs = Vec::new();
        collect_refs(&step.operation, &mut refs);
        let edges = graph.entry(step.result.as_str()).or_default();
        edges.extend(
            refs.into_iter()
                .filter(|r| !initial.contains(r) && producers.contains_key(r)),
        );
    }

    let mut visited = HashSet::new();
    let mut in_path = HashSet::new();
    let mut path = Vec::new();
    for step in &plan.steps {
        let node = step.result.as_str();
        if node.is_empty() || visited.contains(node) {
            continue;
        }
        if let Err(cycle) = dfs_results(node, &graph, &mut visited, &mut in_path, &mut path) {
            let step_id = producers.get(cycle[0]).map(|s| s.id.clone());
            let error = report.error(
                ErrorType::Structure,
                format!("Circular dependency detected: {}", cycle.join(" \u{2192} ")),
            );
            error.step_id = step_id;
            error.variable = Some(cycle[0].to_string());
            return;
        }
    }
}

/// Depth-first search over result names. Returns the first cycle found, as
/// the path from the repeated node back to itself.
fn dfs_results<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_path: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Result<(), Vec<&'a str>> {
    path.push(node);
    in_path.insert(node);

    for &next in graph.get(node).map(Vec::as_slice).unwrap_or_default() {
        if in_path.contains(next) {
            let start = path.iter().position(|&n| n == next).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(next);
            return Err(cycle);
        }
        if !visited.contains(next) {
            dfs_results(next, graph, visited, in_path, path)?;
        }
    }

    in_path.remove(node);
    visited.insert(node);
    path.pop();
    Ok(())
}

fn check_unused_variables(plan: &FormulaPlan, report: &mut ValidationReport) {
    let mut referenced = HashSet::new();
    for step in &plan.steps {
        let mut refs = Vec::new();
        collect_refs(&step.operation, &mut refs);
        referenced.extend(refs);
    }

    for variable in &plan.variables {
        let name = variable.name.as_str();
        if referenced.contains(name) || name == plan.output_variable {
            continue;
        }
        report
            .warning(
                WarningType::Logic,
                format!("Variable '{}' is declared but never used", name),
            )
            .variable = Some(variable.name.clone());
    }
}
