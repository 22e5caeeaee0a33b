//! Error types for Kf status reconciliation
//!
//! Errors are structured with fields to aid debugging in production.
//! The child-resource variants render exactly the message that is written
//! into the matching condition, so a reconciler can surface either one.

use thiserror::Error;

/// Main error type for Kf status operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Validation error for a resource spec or an observed object
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.routes[0].domain")
        field: Option<String>,
    },

    /// A child resource exists but is controlled by something else
    #[error("There is an existing {kind} {name:?} that we do not own.")]
    ChildNotOwned {
        /// Human-readable kind of the child (e.g., "Deployment")
        kind: String,
        /// Name of the conflicting object
        name: String,
    },

    /// The desired child manifest could not be rendered
    #[error("Couldn't populate the {kind} template: {message}")]
    Template {
        /// Human-readable kind of the child
        kind: String,
        /// Underlying rendering failure
        message: String,
    },

    /// An imperative operation against a child resource failed
    #[error("Error occurred while {action} {kind}: {message}")]
    Reconciliation {
        /// What was being attempted (e.g., "updating")
        action: String,
        /// Human-readable kind of the child
        kind: String,
        /// Underlying failure
        message: String,
    },

    /// A condition made no progress within the allowed time
    #[error("timed out, no progress was made in {seconds} seconds, previous status: {previous:?}")]
    Timeout {
        /// The timeout that elapsed, in seconds
        seconds: i64,
        /// Rendering of the condition at the time of the check
        previous: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with a field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an ownership conflict error
    pub fn child_not_owned(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ChildNotOwned {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a template rendering error
    pub fn template(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a reconciliation error for an action against a child
    pub fn reconciliation(
        action: impl Into<String>,
        kind: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Reconciliation {
            action: action.into(),
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(seconds: i64, previous: impl Into<String>) -> Self {
        Self::Timeout {
            seconds,
            previous: previous.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Returns true if a later reconciliation pass may succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Reconciliation { .. } | Self::Timeout { .. })
    }
}
