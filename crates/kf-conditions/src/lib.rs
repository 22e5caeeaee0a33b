//! Condition aggregation for Kf resource statuses
//!
//! A [`ConditionSet`] names the dependent conditions of a resource and the
//! aggregate (`Ready` or `Succeeded`) computed from them. Statuses expose
//! their conditions through [`HasConditions`]; a [`ConditionManager`] borrows
//! one and keeps the aggregate consistent after every write.
//!
//! - `Living` sets recompute the aggregate on every change.
//! - `Batch` sets stop recomputing once the aggregate is terminal, until
//!   [`ConditionManager::reinitialize`] is called.

pub mod manager;
pub mod propagate;
pub mod set;
pub mod single;
pub mod status;

pub use manager::ConditionManager;
pub use propagate::{is_status_final, propagate_condition, summarize_child_conditions};
pub use set::{Aggregation, ConditionSet, ConditionTable};
pub use single::{ConditionUpdate, SingleConditionManager};
pub use status::{HasConditions, Status};

pub use kf_common::{Condition, ConditionStatus, CONDITION_READY, CONDITION_SUCCEEDED};
