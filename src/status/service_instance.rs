//! Status of a ServiceInstance backed by a service broker

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use kf_common::{Condition, CONDITION_READY};
use kf_conditions::{
    ConditionManager, ConditionSet, ConditionTable, HasConditions, SingleConditionManager,
};
use kf_osb::{
    track_last_operation, track_response, DeprovisionResponse, InstanceOperation,
    LastOperationResponse, OsbError, OsbStatus, ProvisionResponse,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::child::secret::secret_missing;
use crate::child::{params_populated_update, rollout_update};

/// Dependent conditions of a ServiceInstance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceInstanceCondition {
    /// The Space the instance lives in is usable
    SpaceReady,
    /// The broker-side instance exists
    BackingResourceReady,
    /// The parameters Secret exists
    ParamsSecretReady,
    /// The parameters Secret holds valid parameters
    ParamsSecretPopulatedReady,
}

impl ConditionTable for ServiceInstanceCondition {
    const DEPENDENTS: &'static [Self] = &[
        Self::SpaceReady,
        Self::BackingResourceReady,
        Self::ParamsSecretReady,
        Self::ParamsSecretPopulatedReady,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::SpaceReady => "SpaceReady",
            Self::BackingResourceReady => "BackingResourceReady",
            Self::ParamsSecretReady => "ParamsSecretReady",
            Self::ParamsSecretPopulatedReady => "ParamsSecretPopulatedReady",
        }
    }
}

/// Status of a ServiceInstance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceStatus {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,

    /// Name of the Secret holding the provisioning parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Last recorded broker state
    #[serde(default, skip_serializing_if = "OsbStatus::is_blank")]
    pub osb_status: OsbStatus,
}

impl HasConditions for ServiceInstanceStatus {
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

impl ServiceInstanceStatus {
    /// Condition manager for the instance's condition set
    pub fn manage(&mut self) -> ConditionManager<'_> {
        ConditionSet::living_for::<ServiceInstanceCondition>().manage(self)
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
            ServiceInstanceCondition::BackingResourceReady.as_str(),
            "BackingResource",
        )
    }

    /// Condition driven by the parameters Secret's existence
    pub fn params_secret_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            ServiceInstanceCondition::ParamsSecretReady.as_str(),
            "Secret",
        )
    }

    /// Condition driven by the parameters Secret's contents
    pub fn params_secret_populated_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            ServiceInstanceCondition::ParamsSecretPopulatedReady.as_str(),
            "Secret",
        )
    }

    /// Mark the Space usable
    pub fn mark_space_healthy(&mut self) {
        self.manage()
            .mark_true(ServiceInstanceCondition::SpaceReady.as_str());
    }

    /// Mark the Space unusable
    pub fn mark_space_unhealthy(&mut self, reason: &str, message: &str) {
        self.manage().mark_false(
            ServiceInstanceCondition::SpaceReady.as_str(),
            reason,
            message,
        );
    }

    /// Mark the backing resource ready without a broker, e.g. user-provided
    pub fn mark_backing_resource_ready(&mut self) {
        self.backing_resource_condition().mark_success();
    }

    /// Record the parameters Secret
    ///
    /// A missing Secret leaves the populated condition as it was.
    pub fn propagate_params_secret_status(&mut self, secret: Option<&Secret>) {
        let Some(secret) = secret else {
            self.params_secret_condition()
                .apply(&secret_missing("Secret for instance parameters does not exist"));
            return;
        };

        self.secret_name = secret.metadata.name.clone();
        self.params_secret_condition().mark_success();
        self.params_secret_populated_condition()
            .apply(&params_populated_update(secret));
    }

    /// Record the rollout of a Deployment backing the instance
    pub fn propagate_deployment_status(&mut self, deployment: &Deployment) {
        self.backing_resource_condition()
            .apply(&rollout_update(deployment));
    }

    /// Record the broker's answer to a provision request
    pub fn propagate_provision_status(&mut self, result: Result<&ProvisionResponse, &OsbError>) {
        let update = track_response(InstanceOperation::Provision, result).record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record a poll of an asynchronous provision
    pub fn propagate_provision_async_status(
        &mut self,
        result: Result<&LastOperationResponse, &OsbError>,
    ) {
        let update = track_last_operation(InstanceOperation::Provision, &self.osb_status, result)
            .record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record the broker's answer to a deprovision request
    pub fn propagate_deprovision_status(
        &mut self,
        result: Result<&DeprovisionResponse, &OsbError>,
    ) {
        let update =
            track_response(InstanceOperation::Deprovision, result).record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }

    /// Record a poll of an asynchronous deprovision
    pub fn propagate_deprovision_async_status(
        &mut self,
        result: Result<&LastOperationResponse, &OsbError>,
    ) {
        let update = track_last_operation(InstanceOperation::Deprovision, &self.osb_status, result)
            .record(&mut self.osb_status);
        self.backing_resource_condition().apply(&update);
    }
}
