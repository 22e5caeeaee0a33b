//! Reading the child objects Kf resources are built from
//!
//! Each function turns an observed child into a [`kf_conditions::ConditionUpdate`]
//! or an [`ObservedChild`]; the resource statuses decide which condition it
//! lands in.

pub mod deployment;
pub mod observed;
pub mod secret;

pub use deployment::{autoscaler_update, rollout_update};
pub use observed::ObservedChild;
pub use secret::{params_populated_update, PARAMS_SECRET_KEY};
