//! Compensation Engine
//!
//! This crate computes an employee's periodic compensation from a typed,
//! pluggable plan: fixed salary, commission, tiered (progressive) commission,
//! or a declarative formula. Inputs are already resolved by the caller
//! (employee snapshot, plan, sales figure, and the period's bonus, deduction
//! and loan transactions); every calculation returns a
//! [`CalculationResult`](models::CalculationResult), with failures reported
//! inline so a batch is never aborted by one bad record.
//!
//! The formula interpreter and its static validator live in [`formula`].

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod formula;
pub mod models;
