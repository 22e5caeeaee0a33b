//! Per-child condition handling
//!
//! A [`SingleConditionManager`] is bound to one dependent condition and the
//! kind of child resource that drives it. Its failure helpers write the
//! condition and hand back an [`Error`] with the same message, so a
//! reconciler can stop a pass with a single `return Err(...)`.

use std::fmt;

use chrono::Utc;
use kf_common::{Condition, ConditionStatus, Error};
use tracing::warn;

use crate::manager::ConditionManager;

/// Reason for a child that exists but is controlled by something else
pub const REASON_NOT_OWNED: &str = "NotOwned";

/// Reason for a child manifest that could not be rendered
pub const REASON_TEMPLATE_ERROR: &str = "TemplateError";

/// Reason for a failed create, update or delete of a child
pub const REASON_RECONCILIATION_ERROR: &str = "ReconciliationError";

/// Reason for a write rejected because the local cache was stale
pub const REASON_CACHE_OUTDATED: &str = "CacheOutdated";

/// Reason for a child that has not been reconciled yet
pub const REASON_RECONCILIATION_PENDING: &str = "ReconciliationPending";

/// The next value of one condition, computed before it is written
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionUpdate {
    /// Mark the condition `True`
    Success,
    /// Mark the condition `Unknown`
    Unknown {
        /// Machine-readable reason
        reason: String,
        /// Human-readable message
        message: String,
    },
    /// Mark the condition `False`
    False {
        /// Machine-readable reason
        reason: String,
        /// Human-readable message
        message: String,
    },
}

impl ConditionUpdate {
    /// An `Unknown` update
    pub fn unknown(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// A `False` update
    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::False {
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// The status this update writes
    pub fn status(&self) -> ConditionStatus {
        match self {
            Self::Success => ConditionStatus::True,
            Self::Unknown { .. } => ConditionStatus::Unknown,
            Self::False { .. } => ConditionStatus::False,
        }
    }

    /// Reason carried by the update, empty for success
    pub fn reason(&self) -> &str {
        match self {
            Self::Success => "",
            Self::Unknown { reason, .. } | Self::False { reason, .. } => reason,
        }
    }

    /// Message carried by the update, empty for success
    pub fn message(&self) -> &str {
        match self {
            Self::Success => "",
            Self::Unknown { message, .. } | Self::False { message, .. } => message,
        }
    }

    /// Build the condition of the given type
    pub fn to_condition(&self, condition_type: &str) -> Condition {
        match self {
            Self::Success => Condition::success(condition_type),
            Self::Unknown { reason, message } | Self::False { reason, message } => {
                Condition::new(condition_type, self.status(), reason, message)
            }
        }
    }
}

/// Manager for the condition driven by a single child resource
pub struct SingleConditionManager<'a> {
    manager: ConditionManager<'a>,
    condition_type: &'static str,
    child_kind: &'static str,
}

impl<'a> SingleConditionManager<'a> {
    /// Bind a manager to one condition type and child kind
    pub fn new(
        manager: ConditionManager<'a>,
        condition_type: &'static str,
        child_kind: &'static str,
    ) -> Self {
        Self {
            manager,
            condition_type,
            child_kind,
        }
    }

    /// The condition type this manager writes
    pub fn condition_type(&self) -> &'static str {
        self.condition_type
    }

    /// Current value of the condition
    pub fn condition(&self) -> Option<&Condition> {
        self.manager.get_condition(self.condition_type)
    }

    /// Returns true while the condition is absent or `Unknown`
    pub fn is_pending(&self) -> bool {
        self.condition().map_or(true, Condition::is_unknown)
    }

    /// Mark the condition `True`
    pub fn mark_success(&mut self) {
        self.manager.mark_true(self.condition_type);
    }

    /// Mark the condition `False`
    pub fn mark_false(&mut self, reason: impl Into<String>, message: impl Into<String>) {
        self.manager.mark_false(self.condition_type, reason, message);
    }

    /// Mark the condition `Unknown`
    pub fn mark_unknown(&mut self, reason: impl Into<String>, message: impl Into<String>) {
        self.manager.mark_unknown(self.condition_type, reason, message);
    }

    /// Mark the child as not yet reconciled
    pub fn mark_reconciliation_pending(&mut self) {
        let message = format!("The {} is still being reconciled", self.child_kind);
        self.mark_unknown(REASON_RECONCILIATION_PENDING, message);
    }

    /// Write a precomputed update
    pub fn apply(&mut self, update: &ConditionUpdate) {
        self.manager
            .set_condition(update.to_condition(self.condition_type));
    }

    /// The child `name` exists but is owned by something else
    pub fn mark_child_not_owned(&mut self, name: &str) -> Error {
        let err = Error::child_not_owned(self.child_kind, name);
        warn!(
            condition = self.condition_type,
            kind = self.child_kind,
            name,
            "child resource is not owned"
        );
        self.mark_false(REASON_NOT_OWNED, err.to_string());
        err
    }

    /// The desired child could not be rendered
    pub fn mark_template_error(&mut self, cause: impl fmt::Display) -> Error {
        let err = Error::template(self.child_kind, cause.to_string());
        self.mark_false(REASON_TEMPLATE_ERROR, err.to_string());
        err
    }

    /// An `action` (e.g. "updating") against the child failed
    ///
    /// A Kubernetes conflict (HTTP 409) means the local cache was stale, so
    /// the condition goes `Unknown` and the next pass retries.
    pub fn mark_reconciliation_error(
        &mut self,
        action: &str,
        cause: &(dyn std::error::Error + 'static),
    ) -> Error {
        let err = Error::reconciliation(action, self.child_kind, cause.to_string());
        if is_conflict(cause) {
            self.mark_unknown(REASON_CACHE_OUTDATED, err.to_string());
        } else {
            self.mark_false(REASON_RECONCILIATION_ERROR, err.to_string());
        }
        err
    }

    /// Time since the condition last changed, zero if it was never set
    pub fn time_since_transition(&self) -> chrono::Duration {
        self.condition()
            .map(|c| Utc::now() - c.last_transition_time)
            .unwrap_or_else(chrono::Duration::zero)
    }

    /// Error if the condition has not changed for at least `timeout`
    pub fn error_if_timeout(&self, timeout: chrono::Duration) -> Result<(), Error> {
        if self.time_since_transition() < timeout {
            return Ok(());
        }
        Err(Error::timeout(timeout.num_seconds(), self.to_string()))
    }
}

impl fmt::Display for SingleConditionManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (status, reason, message) = match self.condition() {
            Some(c) => (c.status, c.reason.as_str(), c.message.as_str()),
            None => (ConditionStatus::Unknown, "", ""),
        };
        write!(
            f,
            "condition: {} status: {:?} reason: {:?} message: {:?}",
            self.condition_type,
            status.to_string(),
            reason,
            message
        )
    }
}

fn is_conflict(cause: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(cause);
    while let Some(err) = current {
        if let Some(kube::Error::Api(response)) = err.downcast_ref::<kube::Error>() {
            if response.code == 409 {
                return true;
            }
        }
        current = err.source();
    }
    false
}
