//! The four broker operations and the states each one records

use std::fmt;

use crate::state::{BindingState, InstanceState, OsbState};

/// Where a recorded operation stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationPhase {
    /// Accepted by the broker, still running
    InProgress,
    /// Finished successfully
    Succeeded,
    /// Finished unsuccessfully
    Failed,
}

/// A broker operation tracked against a resource
///
/// Implementations name the reasons written into the condition and map each
/// outcome onto the member of the resource's state union.
pub trait Operation: Copy + fmt::Display {
    /// State union this operation records into
    type State;

    /// Lower-case verb used in messages ("provision")
    fn verb(self) -> &'static str;

    /// Reason while the operation runs, also used for synchronous failures
    fn in_progress_reason(self) -> &'static str;

    /// Reason for a retryable error while polling
    fn polling_reason(self) -> &'static str;

    /// Reason for a poll reporting failure
    fn failed_reason(self) -> &'static str;

    /// Whether the operation removes the resource, so "already gone" counts
    /// as success
    fn deletes(self) -> bool;

    /// The state recorded for an outcome
    fn state(self, phase: OperationPhase, operation_key: Option<String>) -> Self::State;
}

/// Operations against a service instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceOperation {
    /// Create the instance
    Provision,
    /// Remove the instance
    Deprovision,
}

/// Operations against a service instance binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingOperation {
    /// Create the binding
    Bind,
    /// Remove the binding
    Unbind,
}

impl Operation for InstanceOperation {
    type State = InstanceState;

    fn verb(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Deprovision => "deprovision",
        }
    }

    fn in_progress_reason(self) -> &'static str {
        match self {
            Self::Provision => "ProvisioningInstance",
            Self::Deprovision => "DeprovisioningInstance",
        }
    }

    fn polling_reason(self) -> &'static str {
        match self {
            Self::Provision => "ProvisionPolling",
            Self::Deprovision => "DeprovisionPolling",
        }
    }

    fn failed_reason(self) -> &'static str {
        match self {
            Self::Provision => "ProvisionFailed",
            Self::Deprovision => "DeprovisionFailed",
        }
    }

    fn deletes(self) -> bool {
        matches!(self, Self::Deprovision)
    }

    fn state(self, phase: OperationPhase, operation_key: Option<String>) -> InstanceState {
        let s = OsbState::with_key(operation_key);
        match (self, phase) {
            (Self::Provision, OperationPhase::InProgress) => InstanceState::Provisioning(s),
            (Self::Provision, OperationPhase::Succeeded) => InstanceState::Provisioned(s),
            (Self::Provision, OperationPhase::Failed) => InstanceState::ProvisionFailed(s),
            (Self::Deprovision, OperationPhase::InProgress) => InstanceState::Deprovisioning(s),
            (Self::Deprovision, OperationPhase::Succeeded) => InstanceState::Deprovisioned(s),
            (Self::Deprovision, OperationPhase::Failed) => InstanceState::DeprovisionFailed(s),
        }
    }
}

impl Operation for BindingOperation {
    type State = BindingState;

    fn verb(self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Unbind => "unbind",
        }
    }

    fn in_progress_reason(self) -> &'static str {
        match self {
            Self::Bind => "BindingInstance",
            Self::Unbind => "UnbindingInstance",
        }
    }

    fn polling_reason(self) -> &'static str {
        match self {
            Self::Bind => "BindPolling",
            Self::Unbind => "UnbindPolling",
        }
    }

    fn failed_reason(self) -> &'static str {
        match self {
            Self::Bind => "BindFailed",
            Self::Unbind => "UnbindFailed",
        }
    }

    fn deletes(self) -> bool {
        matches!(self, Self::Unbind)
    }

    fn state(self, phase: OperationPhase, operation_key: Option<String>) -> BindingState {
        let s = OsbState::with_key(operation_key);
        match (self, phase) {
            (Self::Bind, OperationPhase::InProgress) => BindingState::Binding(s),
            (Self::Bind, OperationPhase::Succeeded) => BindingState::Bound(s),
            (Self::Bind, OperationPhase::Failed) => BindingState::BindFailed(s),
            (Self::Unbind, OperationPhase::InProgress) => BindingState::Unbinding(s),
            (Self::Unbind, OperationPhase::Succeeded) => BindingState::Unbound(s),
            (Self::Unbind, OperationPhase::Failed) => BindingState::UnbindFailed(s),
        }
    }
}

impl fmt::Display for InstanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl fmt::Display for BindingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}
