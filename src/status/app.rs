//! Status of an App, rolled up from every child Kf creates for it

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};
use kf_common::{Condition, CONDITION_READY};
use kf_conditions::{
    propagate_condition, summarize_child_conditions, ConditionManager, ConditionSet,
    ConditionTable, HasConditions, SingleConditionManager,
};
use kf_routing::{reconcile_route_status, AppRouteStatus, QualifiedRouteBinding, Route};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::child::{autoscaler_update, rollout_update};
use crate::status::build::BuildStatus;
use crate::status::service_instance_binding::ServiceInstanceBindingStatus;

/// Dependent conditions of an App
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppCondition {
    /// The latest Build succeeded
    BuildReady,
    /// The cluster-internal Service exists
    ServiceReady,
    /// The ServiceAccount exists
    ServiceAccountReady,
    /// The Deployment finished rolling out
    DeploymentReady,
    /// The Space the App lives in is usable
    SpaceReady,
    /// Every route binding is served
    RouteReady,
    /// The environment variable Secret exists
    EnvVarSecretReady,
    /// Every service binding is ready
    ServiceInstanceBindingsReady,
    /// The autoscaler has settled
    HorizontalPodAutoscalerReady,
}

impl ConditionTable for AppCondition {
    const DEPENDENTS: &'static [Self] = &[
        Self::BuildReady,
        Self::ServiceReady,
        Self::ServiceAccountReady,
        Self::DeploymentReady,
        Self::SpaceReady,
        Self::RouteReady,
        Self::EnvVarSecretReady,
        Self::ServiceInstanceBindingsReady,
        Self::HorizontalPodAutoscalerReady,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::BuildReady => "BuildReady",
            Self::ServiceReady => "ServiceReady",
            Self::ServiceAccountReady => "ServiceAccountReady",
            Self::DeploymentReady => "DeploymentReady",
            Self::SpaceReady => "SpaceReady",
            Self::RouteReady => "RouteReady",
            Self::EnvVarSecretReady => "EnvVarSecretReady",
            Self::ServiceInstanceBindingsReady => "ServiceInstanceBindingsReady",
            Self::HorizontalPodAutoscalerReady => "HorizontalPodAutoscalerReady",
        }
    }
}

/// A ServiceInstanceBinding of the App, as read from the cluster
#[derive(Clone, Copy, Debug)]
pub struct ObservedBinding<'a> {
    /// `metadata.name`
    pub name: &'a str,
    /// `metadata.generation`
    pub generation: i64,
    /// The binding's status
    pub status: &'a ServiceInstanceBindingStatus,
}

impl ObservedBinding<'_> {
    fn display_name(&self) -> &str {
        self.status.binding_name.as_deref().unwrap_or(self.name)
    }

    /// The binding's `Ready` under the App-side condition type, `Unknown`
    /// while the binding's status is stale
    fn summary_condition(&self) -> Condition {
        let condition_type = format!("{}Ready", self.display_name());
        let ready = (self.generation == self.status.observed_generation)
            .then(|| self.status.ready_condition())
            .flatten();

        match ready {
            Some(ready) => Condition::new(condition_type, ready.status, &ready.reason, &ready.message),
            None => Condition::new(condition_type, kf_common::ConditionStatus::Unknown, "", ""),
        }
    }
}

/// Status of an App
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,

    /// Image of the latest successful Build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Most recently created Build
    #[serde(default, rename = "latestBuild", skip_serializing_if = "Option::is_none")]
    pub latest_created_build_name: Option<String>,

    /// Most recent Build that succeeded
    #[serde(default, rename = "latestReadyBuild", skip_serializing_if = "Option::is_none")]
    pub latest_ready_build_name: Option<String>,

    /// Name of the App's ServiceAccount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Names of the App's service bindings, sorted by binding object name
    #[serde(default, rename = "serviceBindings", skip_serializing_if = "Vec::is_empty")]
    pub service_binding_names: Vec<String>,

    /// One `<binding>Ready` condition per service binding
    #[serde(default)]
    pub service_binding_conditions: Vec<Condition>,

    /// Per-binding route status
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<AppRouteStatus>,

    /// Sorted URLs the App is reachable at
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,

    /// One `Route<i>Ready` condition per entry of `routes`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_conditions: Vec<Condition>,
}

impl HasConditions for AppStatus {
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

/// Keep the transition time of every condition whose state didn't change
fn carry_transition_times(previous: &[Condition], next: &mut [Condition]) {
    for condition in next {
        if let Some(old) = previous.iter().find(|p| p.same_state(condition)) {
            condition.last_transition_time = old.last_transition_time;
        }
    }
}

impl AppStatus {
    /// Condition manager for the App's condition set
    pub fn manage(&mut self) -> ConditionManager<'_> {
        ConditionSet::living_for::<AppCondition>().manage(self)
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

    fn single(&mut self, condition: AppCondition, kind: &'static str) -> SingleConditionManager<'_> {
        SingleConditionManager::new(self.manage(), condition.as_str(), kind)
    }

    /// Condition driven by the Build
    pub fn build_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(AppCondition::BuildReady, "Build")
    }

    /// Condition driven by the Service
    pub fn service_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(AppCondition::ServiceReady, "Service")
    }

    /// Condition driven by the ServiceAccount
    pub fn service_account_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(AppCondition::ServiceAccountReady, "ServiceAccount")
    }

    /// Condition driven by the Deployment
    pub fn deployment_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(AppCondition::DeploymentReady, "Deployment")
    }

    /// Condition driven by the environment variable Secret
    pub fn env_var_secret_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(AppCondition::EnvVarSecretReady, "Secret")
    }

    /// Condition driven by the HorizontalPodAutoscaler
    pub fn autoscaler_condition(&mut self) -> SingleConditionManager<'_> {
        self.single(
            AppCondition::HorizontalPodAutoscalerReady,
            "HorizontalPodAutoscaler",
        )
    }

    /// Mark the Space usable
    pub fn mark_space_healthy(&mut self) {
        self.manage().mark_true(AppCondition::SpaceReady.as_str());
    }

    /// Mark the Space unusable
    pub fn mark_space_unhealthy(&mut self, reason: &str, message: &str) {
        self.manage()
            .mark_false(AppCondition::SpaceReady.as_str(), reason, message);
    }

    /// Copy the Build named `name` into the App
    ///
    /// The image and ready build only move forward when the Build succeeded.
    pub fn propagate_build_status(&mut self, name: &str, build: &BuildStatus) {
        self.latest_created_build_name = Some(name.to_string());

        let succeeded = propagate_condition(
            &mut self.manage(),
            AppCondition::BuildReady.as_str(),
            build.succeeded_condition(),
        );
        if succeeded {
            if self.image != build.image {
                debug!(build = name, image = ?build.image, "app image changed");
            }
            self.latest_ready_build_name = Some(name.to_string());
            self.image = build.image.clone();
        }
    }

    /// Record the rollout of the App's Deployment
    pub fn propagate_deployment_status(&mut self, deployment: &Deployment) {
        self.deployment_condition()
            .apply(&rollout_update(deployment));
    }

    /// Record the App's autoscaler; `None` when autoscaling is off
    pub fn propagate_autoscaler_status(&mut self, autoscaler: Option<&HorizontalPodAutoscaler>) {
        self.autoscaler_condition()
            .apply(&autoscaler_update(autoscaler));
    }

    /// Record the environment variable Secret
    pub fn propagate_env_var_secret_status(&mut self, _secret: &Secret) {
        self.env_var_secret_condition().mark_success();
    }

    /// Record the App's Service; Services carry no readiness of their own
    pub fn propagate_service_status(&mut self, _service: &Service) {
        self.service_condition().mark_success();
    }

    /// Record the App's ServiceAccount
    pub fn propagate_service_account_status(&mut self, service_account: &ServiceAccount) {
        self.service_account_name = service_account.metadata.name.clone();
        self.service_account_condition().mark_success();
    }

    /// Compare the App's route bindings with the Routes that exist
    ///
    /// `extra` are bindings still present on Routes that the App no longer
    /// declares.
    pub fn propagate_route_status(
        &mut self,
        desired: &[QualifiedRouteBinding],
        routes: &[Route],
        extra: &[QualifiedRouteBinding],
    ) {
        let mut summary = reconcile_route_status(desired, routes, extra);
        carry_transition_times(&self.route_conditions, &mut summary.conditions);

        self.routes = summary.routes;
        self.urls = summary.urls;
        self.route_conditions = summary.conditions;
        propagate_condition(
            &mut self.manage(),
            AppCondition::RouteReady.as_str(),
            Some(&summary.aggregate),
        );
    }

    /// Roll the App's service bindings up into `ServiceInstanceBindingsReady`
    ///
    /// Bindings whose status is older than their spec count as `Unknown`. No
    /// bindings at all is ready.
    pub fn propagate_service_instance_bindings_status(&mut self, bindings: &[ObservedBinding<'_>]) {
        let mut bindings = bindings.to_vec();
        bindings.sort_by(|a, b| a.name.cmp(b.name));

        self.service_binding_names = bindings
            .iter()
            .map(|b| b.display_name().to_string())
            .collect();

        let (ready, mut conditions) =
            summarize_child_conditions(bindings.iter().map(ObservedBinding::summary_condition).collect());
        carry_transition_times(&self.service_binding_conditions, &mut conditions);
        self.service_binding_conditions = conditions;

        propagate_condition(
            &mut self.manage(),
            AppCondition::ServiceInstanceBindingsReady.as_str(),
            Some(&ready),
        );
    }
}
