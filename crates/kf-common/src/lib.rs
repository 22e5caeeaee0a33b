//! Common types for Kf: conditions, errors, logging and configuration

#![deny(missing_docs)]

pub mod condition;
pub mod config;
pub mod error;
pub mod telemetry;

pub use condition::{Condition, ConditionStatus};
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Aggregate condition type for continuously reconciled resources
pub const CONDITION_READY: &str = "Ready";

/// Aggregate condition type for resources whose reconciliation terminates
pub const CONDITION_SUCCEEDED: &str = "Succeeded";
