//! Route bindings for Kf Apps
//!
//! Apps declare [`RouteWeightBinding`]s. Duplicates are merged with
//! [`merge_bindings`], defaults are resolved with
//! [`RouteWeightBinding::qualify`], and [`reconcile_route_status`] compares
//! the result against the [`Route`] objects observed in the cluster.

#![deny(missing_docs)]

pub mod binding;
pub mod reconcile;
pub mod route;

pub use binding::{
    merge_bindings, merge_qualified_bindings, qualify_bindings, QualifiedRouteBinding,
    RouteDestination, RouteSpecFields, RouteWeightBinding, DEFAULT_ROUTE_DESTINATION_PORT,
    DEFAULT_ROUTE_WEIGHT,
};
pub use reconcile::{
    reconcile_route_status, route_condition_type, AppRouteStatus, RouteBindingStatus,
    RouteStatusSummary,
};
pub use route::{Route, RouteCondition, RouteSpec, RouteStatus};
