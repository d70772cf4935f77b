//! Execution trace produced by the formula interpreter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One executed top-level formula step.
///
/// Captures the resolved parameter values, the result, and the name it was
/// bound to, for audit and plan debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    /// The sequential step number, starting at 1.
    pub step_number: u32,
    /// The step's ID.
    pub step_id: String,
    /// The step's name.
    pub step_name: String,
    /// Resolved inputs of the step's operation.
    pub inputs: serde_json::Value,
    /// The value the step produced.
    pub result: Decimal,
    /// The context name the result was bound to.
    pub variable: String,
    /// Time spent on this step in microseconds.
    pub duration_us: u64,
}

/// The complete trace of one formula evaluation.
///
/// When evaluation fails, `steps` holds every step that completed before the
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    /// Unique identifier for this evaluation.
    pub evaluation_id: Uuid,
    /// The executed steps, in order.
    pub steps: Vec<TraceStep>,
    /// How many sub-expressions were served from the memoization cache.
    pub cache_hits: u32,
    /// The total evaluation duration in microseconds.
    pub duration_us: u64,
}

impl ExecutionTrace {
    /// Creates an empty trace with a fresh evaluation ID.
    pub fn new() -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            steps: Vec::new(),
            cache_hits: 0,
            duration_us: 0,
        }
    }
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self::new()
    }
}
