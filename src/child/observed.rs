//! Child objects read back from the cluster as untyped resources
//!
//! Kf reads a handful of children it doesn't define the schema of (Tekton
//! TaskRuns, source packages) and its own resources owned by other
//! controllers. All a parent needs from them is the name, the generation
//! pair and the status conditions, plus a few named status fields.

use kf_common::{Condition, Error, Result};
use kube::core::DynamicObject;
use serde::Deserialize;
use serde_json::Value;

/// Status fields every Kf-style child exposes
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ChildStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    observed_generation: i64,
}

/// A child object reduced to what status propagation reads
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservedChild {
    /// `metadata.name`
    pub name: String,
    /// `metadata.generation`, zero when unset
    pub generation: i64,
    /// `status.observedGeneration`, zero when unset
    pub observed_generation: i64,
    /// `status.conditions`
    pub conditions: Vec<Condition>,
    status: Value,
}

impl ObservedChild {
    /// A child with the given name and conditions, fully observed
    pub fn new(name: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            name: name.into(),
            conditions,
            ..Self::default()
        }
    }

    /// Set the generation pair
    pub fn with_generations(mut self, generation: i64, observed_generation: i64) -> Self {
        self.generation = generation;
        self.observed_generation = observed_generation;
        self
    }

    /// Attach raw status fields for [`Self::status_field`]
    pub fn with_status(mut self, status: Value) -> Self {
        self.status = status;
        self
    }

    /// Read a child from a dynamically typed object
    ///
    /// A missing `status` reads as an unreconciled child with no conditions.
    pub fn from_dynamic(object: &DynamicObject) -> Result<Self> {
        let status = object.data.get("status").cloned().unwrap_or(Value::Null);
        let parsed = if status.is_null() {
            ChildStatus::default()
        } else {
            serde_json::from_value::<ChildStatus>(status.clone()).map_err(|e| {
                Error::serialization(format!(
                    "status of {} is malformed: {e}",
                    object.metadata.name.as_deref().unwrap_or("<unnamed>")
                ))
            })?
        };

        Ok(Self {
            name: object.metadata.name.clone().unwrap_or_default(),
            generation: object.metadata.generation.unwrap_or(0),
            observed_generation: parsed.observed_generation,
            conditions: parsed.conditions,
            status,
        })
    }

    /// The condition of type `condition_type`, if present
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == condition_type)
    }

    /// Returns true once the child's controller has seen its latest spec
    pub fn is_reconciled(&self) -> bool {
        self.generation == self.observed_generation
    }

    /// A top-level string field of the raw status
    pub fn status_field(&self, field: &str) -> Option<&str> {
        self.status.get(field).and_then(Value::as_str)
    }

    /// Value of the named entry in a `[{name, value}]` status list
    ///
    /// Tekton reports task results in this shape.
    pub fn named_result(&self, list: &str, name: &str) -> Option<&str> {
        self.status
            .get(list)?
            .as_array()?
            .iter()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))?
            .get("value")
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kf_common::ConditionStatus;
    use kube::core::{ApiResource, GroupVersionKind};
    use serde_json::json;

    fn task_run(data: Value) -> DynamicObject {
        let gvk = GroupVersionKind::gvk("tekton.dev", "v1beta1", "TaskRun");
        let mut object =
            DynamicObject::new("build-1", &ApiResource::from_gvk(&gvk)).data(data);
        object.metadata.generation = Some(3);
        object
    }

    #[test]
    fn test_reads_conditions_and_generations() {
        let object = task_run(json!({
            "status": {
                "observedGeneration": 3,
                "conditions": [{
                    "type": "Succeeded",
                    "status": "True",
                    "lastTransitionTime": "2020-01-01T00:00:00Z"
                }],
                "taskResults": [{"name": "IMAGE", "value": "gcr.io/app@sha256:1"}],
                "startTime": "2020-01-01T00:00:00Z"
            }
        }));

        let child = ObservedChild::from_dynamic(&object).unwrap();
        assert_eq!(child.name, "build-1");
        assert!(child.is_reconciled());
        assert_eq!(
            child.condition("Succeeded").map(|c| c.status),
            Some(ConditionStatus::True)
        );
        assert_eq!(
            child.named_result("taskResults", "IMAGE"),
            Some("gcr.io/app@sha256:1")
        );
        assert_eq!(child.named_result("taskResults", "DIGEST"), None);
        assert_eq!(child.status_field("startTime"), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_missing_status_is_unreconciled() {
        let child = ObservedChild::from_dynamic(&task_run(json!({}))).unwrap();
        assert!(child.conditions.is_empty());
        assert!(!child.is_reconciled());
        assert_eq!(child.status_field("startTime"), None);
    }

    #[test]
    fn test_conditions_without_transition_time_are_read() {
        let object = task_run(json!({
            "status": {"conditions": [{"type": "Succeeded", "status": "True"}]}
        }));

        let child = ObservedChild::from_dynamic(&object).unwrap();
        assert!(child.condition("Succeeded").is_some_and(|c| c.is_true()));
    }

    #[test]
    fn test_malformed_status_is_a_serialization_error() {
        let object = task_run(json!({"status": {"conditions": "nope"}}));
        let err = ObservedChild::from_dynamic(&object).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(err.to_string().contains("build-1"));
    }
}
