//! Per-evaluation memoization of operator results.
//!
//! Keys are a canonical encoding of the operator type and each parameter's
//! resolved identity:
//!
//! - literal: `lit:<value>`
//! - variable: `var:<name>=<current value>`
//! - nested step: `step:<id>(<nested key>)`
//!
//! A cache lives for exactly one top-level evaluation and is never shared.

use std::collections::HashMap;

use rust_decimal::Decimal;

/// Memoized operator results for a single formula evaluation.
#[derive(Debug, Default)]
pub(crate) struct MemoCache {
    entries: HashMap<String, Decimal>,
    hits: u32,
}

impl MemoCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Looks up a key, counting hits.
    pub(crate) fn get(&mut self, key: &str) -> Option<Decimal> {
        let value = self.entries.get(key).copied();
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    pub(crate) fn insert(&mut self, key: String, value: Decimal) {
        self.entries.insert(key, value);
    }

    pub(crate) fn hits(&self) -> u32 {
        self.hits
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Builds canonical memo keys.
pub(crate) struct MemoKey {
    parts: Vec<String>,
    cacheable: bool,
}

impl MemoKey {
    pub(crate) fn new(operator: &str) -> Self {
        Self {
            parts: vec![operator.to_string()],
            cacheable: true,
        }
    }

    pub(crate) fn literal(&mut self, value: Decimal) {
        self.parts.push(format!("lit:{}", value.normalize()));
    }

    pub(crate) fn variable(&mut self, name: &str, value: Decimal) {
        self.parts.push(format!("var:{}={}", name, value.normalize()));
    }

    /// Records a nested sub-expression by ID and its own key, so a reused ID
    /// over different variable values does not collide. Anonymous or
    /// uncacheable sub-expressions make the whole key uncacheable.
    pub(crate) fn nested(&mut self, step_id: &str, inner: Option<String>) {
        match inner {
            Some(inner) if !step_id.is_empty() => {
                self.parts.push(format!("step:{}({})", step_id, inner));
            }
            _ => self.cacheable = false,
        }
    }

    pub(crate) fn finish(self) -> Option<String> {
        self.cacheable.then(|| self.parts.join("|"))
    }
}
