//! Kubernetes-style conditions shared by every Kf resource status

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
///
/// Identity is `type_`: a status holds at most one condition per type.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Ready, BackingResourceReady)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the condition transitioned
    ///
    /// Children may omit it; those read as transitioning now.
    #[serde(rename = "lastTransitionTime", default = "Utc::now")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Create a `True` condition; success carries no reason or message
    pub fn success(type_: impl Into<String>) -> Self {
        Self::new(type_, ConditionStatus::True, "", "")
    }

    /// Returns true if the status is `True`
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// Returns true if the status is `False`
    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    /// Returns true if the status is `Unknown`
    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }

    /// Compare everything except the transition timestamp
    pub fn same_state(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_timestamp() {
        let before = Utc::now();
        let condition = Condition::new(
            "Ready",
            ConditionStatus::True,
            "AppReady",
            "App is ready",
        );
        let after = Utc::now();

        assert_eq!(condition.type_, "Ready");
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, "AppReady");
        assert_eq!(condition.message, "App is ready");
        assert!(condition.last_transition_time >= before);
        assert!(condition.last_transition_time <= after);
    }

    #[test]
    fn test_default_status_is_unknown() {
        assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
    }

    #[test]
    fn test_status_serializes_as_kubernetes_strings() {
        for status in [
            ConditionStatus::True,
            ConditionStatus::False,
            ConditionStatus::Unknown,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
            let parsed: ConditionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_same_state_ignores_timestamp() {
        let a = Condition::new("Ready", ConditionStatus::False, "Bad", "msg");
        let mut b = a.clone();
        b.last_transition_time = a.last_transition_time - chrono::Duration::hours(1);
        assert!(a.same_state(&b));

        b.message = "other".to_string();
        assert!(!a.same_state(&b));
    }

    #[test]
    fn test_wire_format_omits_empty_reason_and_message() {
        let json = serde_json::to_value(Condition::success("Ready")).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "True");
        assert!(json.get("reason").is_none());
        assert!(json.get("message").is_none());
        assert!(json.get("lastTransitionTime").is_some());
    }

    #[test]
    fn test_deserializes_without_reason() {
        let condition: Condition = serde_json::from_str(
            r#"{"type":"Ready","status":"Unknown","lastTransitionTime":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(condition.is_unknown());
        assert!(condition.reason.is_empty());
    }

    #[test]
    fn test_deserializes_without_transition_time() {
        let before = Utc::now();
        let condition: Condition =
            serde_json::from_str(r#"{"type":"Succeeded","status":"True"}"#).unwrap();
        assert!(condition.is_true());
        assert!(condition.last_transition_time >= before);
    }
}
