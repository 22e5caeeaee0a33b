//! The status interface condition managers operate on

use kf_common::Condition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A resource status that carries conditions
///
/// Implemented by every resource status so managers can read and write
/// conditions without knowing the concrete type.
pub trait HasConditions {
    /// Current conditions, at most one per type
    fn conditions(&self) -> &[Condition];

    /// Mutable access for managers
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Generation of the spec this status was computed from
    fn observed_generation(&self) -> i64;
}

/// Plain status with conditions and an observed generation
///
/// Used for summaries that are not stored on a resource of their own.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,
}

impl HasConditions for Status {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn observed_generation(&self) -> i64 {
        self.observed_generation
    }
}
