//! Configuration loading and management for the compensation engine.
//!
//! This module provides the engine settings (result caching and formula
//! interpreter limits) and a loader that reads them from YAML.
//!
//! # Example
//!
//! ```no_run
//! use compensation_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/engine.yaml").unwrap();
//! println!("Caching enabled: {}", config.config().cache.enabled);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{CacheSettings, EngineConfig, FormulaSettings};
