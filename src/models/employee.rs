//! Employee snapshot model.
//!
//! Calculators receive a read-only snapshot of the employee: an ID plus an
//! open-ended bag of attributes that formula variables can read by dot-path.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A point-in-time view of an employee, as supplied by the caller.
///
/// Any field besides `id` and `name` is collected into `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSnapshot {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Every other employee property, possibly nested.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EmployeeSnapshot {
    /// Creates a snapshot with no attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            attributes: Map::new(),
        }
    }

    /// Adds an attribute, returning the updated snapshot.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Reads a numeric attribute by dot-separated path.
    ///
    /// Numbers and numeric strings are accepted. Missing segments, non-object
    /// intermediates, and non-numeric leaves all yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use compensation_engine::models::EmployeeSnapshot;
    /// use rust_decimal::Decimal;
    /// use serde_json::json;
    ///
    /// let employee = EmployeeSnapshot::new("emp_001")
    ///     .with_attribute("profile", json!({ "yearsOfService": 4 }));
    ///
    /// assert_eq!(employee.attribute("profile.yearsOfService"), Some(Decimal::from(4)));
    /// assert_eq!(employee.attribute("profile.missing"), None);
    /// ```
    pub fn attribute(&self, path: &str) -> Option<Decimal> {
        let mut segments = path.split('.');
        let mut current = self.attributes.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        numeric_value(current)
    }
}

fn numeric_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
