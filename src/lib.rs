//! Kf - status and consistency layer for Cloud Foundry style Apps on Kubernetes
//!
//! Every Kf resource reports a `Ready` (or, for one-shot Builds, `Succeeded`)
//! condition computed from the state of the children it is built from. This
//! crate wires the building blocks of the workspace into per-resource status
//! types.
//!
//! # Modules
//!
//! - [`status`] - `AppStatus`, `BuildStatus`, `ServiceInstanceStatus`,
//!   `ServiceInstanceBindingStatus`
//! - [`child`] - turning Deployments, autoscalers, Secrets and untyped child
//!   objects into condition updates
//!
//! The building blocks live in their own crates and are re-exported here:
//! conditions in [`kf_conditions`], broker operation tracking in [`kf_osb`],
//! routes in [`kf_routing`], errors, logging and configuration in
//! [`kf_common`].

#![deny(missing_docs)]

pub mod child;
pub mod status;

pub use kf_common::{config, telemetry, Condition, ConditionStatus, Error, Result};
pub use kf_conditions as conditions;
pub use kf_osb as osb;
pub use kf_routing as routing;

pub use child::ObservedChild;
pub use status::{AppStatus, BuildStatus, ServiceInstanceBindingStatus, ServiceInstanceStatus};
