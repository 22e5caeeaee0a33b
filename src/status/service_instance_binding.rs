//! Status of a ServiceInstanceBinding, the credentials an App gets for a
//! ServiceInstance

use k8s_openapi::api::core::v1::Secret;
use kf_common::{Condition, CONDITION_READY};
use kf_conditions::{
    propagate_condition, ConditionManager, ConditionSet, ConditionTable, HasConditions,
    SingleConditionManager,
};
use kf_osb::{
    track_last_operation, track_response, BindResponse, BindingOperation, BindingOsbStatus,
    LastOperationResponse, OsbError, UnbindResponse,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::child::params_populated_update;
use crate::child::secret::secret_missing;
use crate::status::service_instance::ServiceInstanceStatus;

/// Dependent conditions of a ServiceInstanceBinding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingCondition {
    /// The bound instance is ready
    ServiceInstanceReady,
    /// The broker-side binding exists
    BackingResourceReady,
    /// The parameters Secret exists
    ParamsSecretReady,
    /// The parameters Secret holds valid parameters
    ParamsSecretPopulatedReady,
    /// The credentials Secret exists
    CredentialsSecretReady,
}

impl ConditionTable for BindingCondition {
    const DEPENDENTS: &'static [Self] = &[
        Self::ServiceInstanceReady,
        Self::BackingResourceReady,
        Self::ParamsSecretReady,
        Self::ParamsSecretPopulatedReady,
        Self::CredentialsSecretReady,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::ServiceInstanceReady => "ServiceInstanceReady",
            Self::BackingResourceReady => "BackingResourceReady",
            Self::ParamsSecretReady => "ParamsSecretReady",
            Self::ParamsSecretPopulatedReady => "ParamsSecretPopulatedReady",
            Self::CredentialsSecretReady => "CredentialsSecretReady",
        }
    }
}

/// Status of a ServiceInstanceBinding
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceBindingStatus {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,

    /// Name the binding is exposed to the App under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_name: Option<String>,

    /// Name of the Secret holding the credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_name: Option<String>,

    /// Last recorded broker state
    #[serde(default, skip_serializing_if = "BindingOsbStatus::is_blank")]
    pub osb_status: BindingOsbStatus,
}

impl HasConditions for ServiceInstanceBindingStatus {
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

impl ServiceInstanceBindingStatus {
    /// Condition manager for the binding's condition set
    pub fn manage(&mut self) -> ConditionManager<'_> {
        ConditionSet::living_for::<BindingCondition>().manage(self)
    }

    /// Fill in absent conditions
    pub fn initialize_conditions(&mut self) {
        self.manage().initialize_conditions();
    }

    /// The aggregate condition
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == CONDITION_READY)
    }

    /// Returns true if the aggregate is `True`
    pub fn is_ready(&self) -> bool {
        self.ready_condition().is_some_and(Condition::is_true)
    }

    /// Condition driven by the broker
    pub fn backing_resource_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BindingCondition::BackingResourceReady.as_str(),
            "BackingResource",
        )
    }

    /// Condition driven by the parameters Secret's existence
    pub fn params_secret_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BindingCondition::ParamsSecretReady.as_str(),
            "Secret",
        )
    }

    /// Condition driven by the parameters Secret's contents
    pub fn params_secret_populated_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BindingCondition::ParamsSecretPopulatedReady.as_str(),
            "Secret",
        )
    }

    /// Condition driven by the credentials Secret
    pub fn credentials_secret_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BindingCondition::CredentialsSecretReady.as_str(),
            "Secret",
        )
    }

    /// Mark the backing resource ready without a broker
    pub fn mark_backing_resource_ready(&mut self) {
        self.backing_resource_condition().mark_success();
    }

    /// Copy the instance's `Ready` into `ServiceInstanceReady`
    pub fn propagate_service_instance_status(&mut self, instance: &ServiceInstanceStatus) {
        propagate_condition(
            &mut self.manage(),
            BindingCondition::ServiceInstanceReady.as_str(),
            instance.ready_condition(),
        );
    }

    /// Record the name the App sees the binding under
    ///
    /// A non-empty override wins over the instance name.
    pub fn propagate_binding_name(&mut self, name_override: Option<&str>, instance_name: &str) {
        let name = name_override
            .filter(|n| !n.is_empty())
            .unwrap_or(instance_name);
        self.binding_name = Some(name.to_string());
    }

    /// Record the parameters Secret
    ///
    /// A missing Secret leaves the populated condition as it was.
    pub fn propagate_params_secret_status(&mut self, secret: Option<&Secret>) {
        let Some(secret) = secret else {
            self.params_secret_condition()
                .apply(&secret_missing("Secret for binding parameters doesn't exist"));
            return;
        };

        self.params_secret_condition().mark_success();
        self.params_secret_populated_condition()
            .apply(&params_populated_update(secret));
    }

    /// Record the credentials Secret
    pub fn propagate_credentials_secret_status(&mut self, secret: Option<&Secret>) {
        match secret {
            Some(secret) => {
                self.credentials_secret_name = secret.metadata.name.clone();
                self.credentials_secret_condition().mark_success();
            }
            None => {
                self.credentials_secret_name = None;
                self.credentials_secret_condition()
                    .apply(&secret_missing("Secret for binding credentials doesn't exist"));
            }
        }
    }

    /// Record the broker's answer to a bind request
    pub fn propagate_bind_status(&mut self, result: Result<&BindResponse, &OsbError>) {
        let update = track_response(BindingOperation::Bind, result).record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record a poll of an asynchronous bind
    pub fn propagate_bind_last_operation_status(
        &mut self,
        result: Result<&LastOperationResponse, &OsbError>,
    ) {
        let update = track_last_operation(BindingOperation::Bind, &self.osb_status, result)
            .record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record the broker's answer to an unbind request
    pub fn propagate_unbind_status(&mut self, result: Result<&UnbindResponse, &OsbError>) {
        let update = track_response(BindingOperation::Unbind, result).record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record a poll of an asynchronous unbind
    pub fn propagate_unbind_last_operation_status(
        &mut self,
        result: Result<&LastOperationResponse, &OsbError>,
    ) {
        let update = track_last_operation(BindingOperation::Unbind, &self.osb_status, result)
            .record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }
}
