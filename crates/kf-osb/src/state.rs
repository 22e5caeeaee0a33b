//! Recorded broker operation state

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::operation::OperationPhase;

/// Payload of a recorded operation state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OsbState {
    /// Broker-assigned handle for a long-running operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_key: Option<String>,
}

impl OsbState {
    /// State carrying an operation key
    pub fn with_key(operation_key: Option<String>) -> Self {
        Self { operation_key }
    }
}

/// Operation state of a service instance
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InstanceState {
    /// Provision accepted, not yet finished
    Provisioning(OsbState),
    /// Provision finished
    Provisioned(OsbState),
    /// Provision failed
    ProvisionFailed(OsbState),
    /// Deprovision accepted, not yet finished
    Deprovisioning(OsbState),
    /// Deprovision finished, or the instance was already gone
    Deprovisioned(OsbState),
    /// Deprovision failed
    DeprovisionFailed(OsbState),
}

/// Operation state of a service instance binding
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BindingState {
    /// Bind accepted, not yet finished
    Binding(OsbState),
    /// Bind finished
    Bound(OsbState),
    /// Bind failed
    BindFailed(OsbState),
    /// Unbind accepted, not yet finished
    Unbinding(OsbState),
    /// Unbind finished, or the binding was already gone
    Unbound(OsbState),
    /// Unbind failed
    UnbindFailed(OsbState),
}

impl InstanceState {
    /// The payload
    pub fn osb_state(&self) -> &OsbState {
        match self {
            Self::Provisioning(s)
            | Self::Provisioned(s)
            | Self::ProvisionFailed(s)
            | Self::Deprovisioning(s)
            | Self::Deprovisioned(s)
            | Self::DeprovisionFailed(s) => s,
        }
    }

    /// Where the recorded operation stands
    pub fn phase(&self) -> OperationPhase {
        match self {
            Self::Provisioning(_) | Self::Deprovisioning(_) => OperationPhase::InProgress,
            Self::Provisioned(_) | Self::Deprovisioned(_) => OperationPhase::Succeeded,
            Self::ProvisionFailed(_) | Self::DeprovisionFailed(_) => OperationPhase::Failed,
        }
    }

    /// Wire name of the recorded member
    pub fn name(&self) -> &'static str {
        match self {
            Self::Provisioning(_) => "provisioning",
            Self::Provisioned(_) => "provisioned",
            Self::ProvisionFailed(_) => "provisionFailed",
            Self::Deprovisioning(_) => "deprovisioning",
            Self::Deprovisioned(_) => "deprovisioned",
            Self::DeprovisionFailed(_) => "deprovisionFailed",
        }
    }
}

impl BindingState {
    /// The payload
    pub fn osb_state(&self) -> &OsbState {
        match self {
            Self::Binding(s)
            | Self::Bound(s)
            | Self::BindFailed(s)
            | Self::Unbinding(s)
            | Self::Unbound(s)
            | Self::UnbindFailed(s) => s,
        }
    }

    /// Where the recorded operation stands
    pub fn phase(&self) -> OperationPhase {
        match self {
            Self::Binding(_) | Self::Unbinding(_) => OperationPhase::InProgress,
            Self::Bound(_) | Self::Unbound(_) => OperationPhase::Succeeded,
            Self::BindFailed(_) | Self::UnbindFailed(_) => OperationPhase::Failed,
        }
    }

    /// Wire name of the recorded member
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binding(_) => "binding",
            Self::Bound(_) => "bound",
            Self::BindFailed(_) => "bindFailed",
            Self::Unbinding(_) => "unbinding",
            Self::Unbound(_) => "unbound",
            Self::UnbindFailed(_) => "unbindFailed",
        }
    }
}

/// Recorded broker state: nothing yet, or exactly one state
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct BrokerStatus<S>(Option<S>);

/// Broker state of a service instance
pub type OsbStatus = BrokerStatus<InstanceState>;

/// Broker state of a service instance binding
pub type BindingOsbStatus = BrokerStatus<BindingState>;

impl<S> Default for BrokerStatus<S> {
    fn default() -> Self {
        Self(None)
    }
}

impl<S> BrokerStatus<S> {
    /// No broker interaction has been recorded
    pub fn blank() -> Self {
        Self(None)
    }

    /// A status holding `state`
    pub fn new(state: S) -> Self {
        Self(Some(state))
    }

    /// True until the first tracked call
    pub fn is_blank(&self) -> bool {
        self.0.is_none()
    }

    /// The recorded state
    pub fn state(&self) -> Option<&S> {
        self.0.as_ref()
    }

    /// Record the state chosen by a tracked call; `None` keeps the current one
    pub fn record(&mut self, next: Option<S>) {
        if let Some(state) = next {
            self.0 = Some(state);
        }
    }
}

impl OsbStatus {
    /// Operation key of the recorded state
    pub fn operation_key(&self) -> Option<&str> {
        self.state()
            .and_then(|s| s.osb_state().operation_key.as_deref())
    }
}

impl BindingOsbStatus {
    /// Operation key of the recorded state
    pub fn operation_key(&self) -> Option<&str> {
        self.state()
            .and_then(|s| s.osb_state().operation_key.as_deref())
    }
}
