//! Configuration types for the compensation engine.
//!
//! These are deserialized from the engine YAML file, and every section has a
//! default so a partial file (or no file at all) is valid.

use std::time::Duration;

use serde::Deserialize;

/// Settings for the per-calculator result caches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether calculators memoize successful results.
    pub enabled: bool,
    /// Maximum number of entries held by each calculator's cache.
    pub max_capacity: u64,
    /// How long an entry stays valid, in seconds.
    pub ttl_seconds: u64,
}

impl CacheSettings {
    /// Returns the configured time-to-live as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            ttl_seconds: 3_600,
        }
    }
}

/// Limits applied by the formula interpreter and validator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormulaSettings {
    /// Maximum depth of nested operators inside a single step.
    pub max_nesting_depth: usize,
    /// Step count above which the validator emits a performance warning.
    pub max_steps_warning: usize,
}

impl Default for FormulaSettings {
    fn default() -> Self {
        Self {
            max_nesting_depth: 32,
            max_steps_warning: 50,
        }
    }
}

/// The complete engine configuration.
///
/// # Example
///
/// ```
/// use compensation_engine::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.cache.enabled);
/// assert_eq!(config.formula.max_nesting_depth, 32);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Result cache settings shared by all calculators.
    pub cache: CacheSettings,
    /// Formula interpreter limits.
    pub formula: FormulaSettings,
}

impl EngineConfig {
    /// Returns a copy of this configuration with result caching turned off.
    pub fn without_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }
}
