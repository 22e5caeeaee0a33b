//! The Route resource and its status lifecycle

use kf_common::Condition;
use kf_conditions::{
    ConditionManager, ConditionSet, ConditionTable, HasConditions, SingleConditionManager,
    CONDITION_READY,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::binding::{RouteDestination, RouteSpecFields};

/// Dependent conditions of a Route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteCondition {
    /// The VirtualService serving the route is reconciled
    VirtualServiceReady,
    /// The route's domain is permitted by its Space
    SpaceDomainReady,
    /// At most one route service is bound
    RouteServiceReady,
}

impl ConditionTable for RouteCondition {
    const DEPENDENTS: &'static [Self] = &[
        Self::VirtualServiceReady,
        Self::SpaceDomainReady,
        Self::RouteServiceReady,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::VirtualServiceReady => "VirtualServiceReady",
            Self::SpaceDomainReady => "SpaceDomainReady",
            Self::RouteServiceReady => "RouteServiceReady",
        }
    }
}

/// Specification for a Route
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kf.dev",
    version = "v1alpha1",
    kind = "Route",
    plural = "routes",
    namespaced,
    status = "RouteStatus",
    printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.hostname"}"#,
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Path","type":"string","jsonPath":".spec.path"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Address of the route
    #[serde(flatten)]
    pub fields: RouteSpecFields,
}

/// Status of a Route
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,

    /// Address the status was computed for
    #[serde(flatten)]
    pub fields: RouteSpecFields,

    /// Name of the VirtualService serving the route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_service: Option<String>,

    /// Destinations the route currently sends traffic to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<RouteDestination>,

    /// Sorted, de-duplicated service names of `bindings`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_binding_display_names: Vec<String>,

    /// Route service bound to the route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service: Option<String>,
}

impl HasConditions for RouteStatus {
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

impl RouteStatus {
    /// Condition manager for the Route's condition set
    pub fn manage(&mut self) -> ConditionManager<'_> {
        ConditionSet::living_for::<RouteCondition>().manage(self)
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

    /// Condition driven by the VirtualService
    pub fn virtual_service_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            RouteCondition::VirtualServiceReady.as_str(),
            "VirtualService",
        )
    }

    /// Condition driven by the Space's domain list
    pub fn space_domain_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            RouteCondition::SpaceDomainReady.as_str(),
            "SpaceDomain",
        )
    }

    /// Condition driven by route service bindings
    pub fn route_service_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            RouteCondition::RouteServiceReady.as_str(),
            "RouteService",
        )
    }

    /// Record the observed VirtualService
    ///
    /// `observed` is the VirtualService name (`None` while it doesn't exist
    /// yet) or the error from reconciling it. When `should_track` is false
    /// the condition is `True` regardless, and a known name is kept.
    pub fn propagate_virtual_service(
        &mut self,
        observed: Result<Option<&str>, &(dyn std::error::Error + 'static)>,
        should_track: bool,
    ) {
        if !should_track {
            self.virtual_service_condition().mark_success();
            if let Ok(Some(name)) = observed {
                self.virtual_service = Some(name.to_string());
            }
            return;
        }

        match observed {
            Err(err) => {
                self.virtual_service_condition()
                    .mark_reconciliation_error("reconciling", err);
                self.virtual_service = None;
            }
            Ok(None) => {
                self.virtual_service_condition().mark_reconciliation_pending();
                self.virtual_service = None;
            }
            Ok(Some(name)) => {
                self.virtual_service_condition().mark_success();
                self.virtual_service = Some(name.to_string());
            }
        }
    }

    /// Record the address the status was computed for
    pub fn propagate_route_spec_fields(&mut self, fields: &RouteSpecFields) {
        self.fields = fields.clone();
    }

    /// Record the destinations the route serves
    pub fn propagate_bindings(&mut self, bindings: &[RouteDestination]) {
        self.bindings = bindings.to_vec();

        let mut names: Vec<String> = bindings.iter().map(|b| b.service_name.clone()).collect();
        names.sort();
        names.dedup();
        self.app_binding_display_names = names;
    }

    /// Record the route services bound to the route
    ///
    /// More than one is an error; the most recently bound one is recorded.
    pub fn propagate_route_service_binding(&mut self, route_services: &[String]) {
        if route_services.len() > 1 {
            self.route_service_condition().mark_false(
                "MultipleRouteServices",
                format!(
                    "More than one route service is bound: [{}]",
                    route_services.join(", ")
                ),
            );
            self.route_service = route_services.last().cloned();
            return;
        }

        self.route_service = route_services.first().cloned();
        self.route_service_condition().mark_success();
    }

    /// Record whether the Space permits the route's domain
    ///
    /// `space_domain` is the matching domain entry on the Space, if any.
    pub fn propagate_space_domain(&mut self, space_domain: Option<&str>) {
        match space_domain {
            Some(_) => self.space_domain_condition().mark_success(),
            None => {
                let cause = kf_common::Error::validation(
                    "The domain specified on the Route isn't permitted by the Space",
                );
                self.space_domain_condition()
                    .mark_reconciliation_error("InvalidDomain", &cause);
            }
        }
    }
}

impl Route {
    /// `metadata.generation`, zero when unset
    pub fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or(0)
    }

    /// Generation recorded in the status, zero without a status
    pub fn observed_generation(&self) -> i64 {
        self.status.as_ref().map_or(0, |s| s.observed_generation)
    }

    /// Returns true once the status reflects the current spec
    pub fn is_reconciled(&self) -> bool {
        self.generation() == self.observed_generation()
    }

    /// The Route's aggregate condition
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status.as_ref().and_then(RouteStatus::ready_condition)
    }

    /// Returns true if the Route's aggregate is `True`
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(RouteStatus::is_ready)
    }

    /// Reconciled, and nothing is bound to it any more
    ///
    /// A Route that was never reconciled or is out of date is not orphaned.
    pub fn is_orphaned(&self) -> bool {
        if self.generation() == 0 || !self.is_reconciled() {
            return false;
        }
        self.status.as_ref().map_or(true, |s| s.bindings.is_empty())
    }

    /// Returns true if the status lists exactly this destination
    pub fn has_destination(&self, needle: &RouteDestination) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.bindings.iter().any(|d| d == needle))
    }
}
