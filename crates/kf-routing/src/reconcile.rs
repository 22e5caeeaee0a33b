//! Reconciling an App's desired route bindings against observed Routes

use kf_common::{Condition, ConditionStatus, CONDITION_READY};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::QualifiedRouteBinding;
use crate::route::Route;

/// Readiness of one App route binding
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum RouteBindingStatus {
    /// Not known to be serving yet
    #[default]
    Unknown,
    /// Serving traffic
    Ready,
    /// No longer desired, still present on the Route
    Orphaned,
}

/// Status of one route binding of an App
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppRouteStatus {
    /// The binding
    #[serde(flatten)]
    pub binding: QualifiedRouteBinding,

    /// VirtualService serving the binding, once ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_service: Option<String>,

    /// URL of the route
    pub url: String,

    /// Readiness of the binding
    #[serde(default)]
    pub status: RouteBindingStatus,
}

/// Everything [`reconcile_route_status`] computes for an App
#[derive(Clone, Debug, PartialEq)]
pub struct RouteStatusSummary {
    /// Desired bindings sorted by URL, then orphaned ones sorted by URL
    pub routes: Vec<AppRouteStatus>,

    /// One `Route<i>Ready` condition per entry of `routes`
    pub conditions: Vec<Condition>,

    /// Overall `Ready` condition across all entries
    pub aggregate: Condition,

    /// Sorted URLs of every entry
    pub urls: Vec<String>,
}

/// Why a binding isn't ready, most actionable first
///
/// The aggregate reports the entry with the highest-priority outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Outcome {
    Missing,
    Reconciling,
    Unhealthy,
    BindingPropagating,
    ExtraBinding,
    Ready,
}

/// Per-binding condition type for position `index`
pub fn route_condition_type(index: usize) -> String {
    format!("Route{index}Ready")
}

/// Compare desired bindings with the Routes that exist
///
/// `extra` are bindings found on Routes that the App no longer declares.
/// The aggregate surfaces only the most actionable problem, in the order
/// missing Route, Route reconciling, Route unhealthy, binding not yet on
/// the Route, extra binding.
pub fn reconcile_route_status(
    desired: &[QualifiedRouteBinding],
    routes: &[Route],
    extra: &[QualifiedRouteBinding],
) -> RouteStatusSummary {
    let mut desired = desired.to_vec();
    desired.sort_by_cached_key(|b| b.source.to_string());
    let mut extra = extra.to_vec();
    extra.sort_by_cached_key(|b| b.source.to_string());

    let mut entries: Vec<(AppRouteStatus, Condition, Outcome)> =
        Vec::with_capacity(desired.len() + extra.len());

    for binding in desired {
        let index = entries.len();
        let route = routes.iter().find(|r| r.spec.fields == binding.source);
        entries.push(desired_entry(index, binding, route));
    }

    for binding in extra {
        let index = entries.len();
        let url = binding.source.to_string();
        let condition = Condition::new(
            route_condition_type(index),
            ConditionStatus::Unknown,
            "ExtraRouteBinding",
            format!("The Route {url} has an extra binding to this App"),
        );
        let status = AppRouteStatus {
            binding,
            virtual_service: None,
            url,
            status: RouteBindingStatus::Orphaned,
        };
        entries.push((status, condition, Outcome::ExtraBinding));
    }

    let aggregate = entries
        .iter()
        .filter(|(_, _, outcome)| *outcome != Outcome::Ready)
        .min_by_key(|(_, _, outcome)| *outcome)
        .map(|(_, condition, _)| {
            Condition::new(
                CONDITION_READY,
                condition.status,
                &condition.reason,
                &condition.message,
            )
        })
        .unwrap_or_else(|| Condition::success(CONDITION_READY));

    debug!(
        bindings = entries.len(),
        status = %aggregate.status,
        reason = %aggregate.reason,
        "reconciled route bindings"
    );

    let mut urls: Vec<String> = entries.iter().map(|(s, _, _)| s.url.clone()).collect();
    urls.sort();

    let (routes, conditions): (Vec<_>, Vec<_>) = entries.into_iter().map(|(s, c, _)| (s, c)).unzip();

    RouteStatusSummary {
        routes,
        conditions,
        aggregate,
        urls,
    }
}

fn desired_entry(
    index: usize,
    binding: QualifiedRouteBinding,
    route: Option<&Route>,
) -> (AppRouteStatus, Condition, Outcome) {
    let url = binding.source.to_string();
    let condition_type = route_condition_type(index);
    let mut status = AppRouteStatus {
        binding,
        virtual_service: None,
        url,
        status: RouteBindingStatus::Unknown,
    };

    let (outcome, condition) = match route {
        None => (
            Outcome::Missing,
            Condition::new(
                condition_type,
                ConditionStatus::Unknown,
                "RouteMissing",
                format!("No Route defined for URL: {}", status.url),
            ),
        ),
        Some(route) if !route.is_reconciled() => (
            Outcome::Reconciling,
            Condition::new(
                condition_type,
                ConditionStatus::Unknown,
                "RouteReconciling",
                "The Route is currently updating",
            ),
        ),
        Some(route) if !route.is_ready() => {
            let (route_status, reason, message) = match route.ready_condition() {
                Some(c) => (c.status, c.reason.as_str(), c.message.as_str()),
                None => (ConditionStatus::Unknown, "", ""),
            };
            (
                Outcome::Unhealthy,
                Condition::new(
                    condition_type,
                    route_status,
                    "RouteUnhealthy",
                    format!("Route has status {reason}: {message}"),
                ),
            )
        }
        Some(route) if !route.has_destination(&status.binding.destination) => (
            Outcome::BindingPropagating,
            Condition::new(
                condition_type,
                ConditionStatus::Unknown,
                "RouteBindingPropagating",
                "The binding is still propagating to the Route",
            ),
        ),
        Some(route) => {
            status.status = RouteBindingStatus::Ready;
            status.virtual_service = route
                .status
                .as_ref()
                .and_then(|s| s.virtual_service.clone());
            (
                Outcome::Ready,
                Condition::new(
                    condition_type,
                    ConditionStatus::True,
                    "RouteReady",
                    "The Route is up to date and is mapped to this App",
                ),
            )
        }
    };

    (status, condition, outcome)
}
