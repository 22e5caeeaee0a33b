//! Copying and summarizing conditions observed on child objects

use kf_common::{Condition, CONDITION_READY, CONDITION_SUCCEEDED};
use tracing::warn;

use crate::manager::ConditionManager;
use crate::set::ConditionSet;
use crate::status::Status;

/// Copy a child's condition into the `destination` slot of a parent
///
/// `False` and `Unknown` carry the child's reason and message over verbatim;
/// `True` is written without either. A missing source leaves the parent
/// untouched. Returns whether the source was `True`.
pub fn propagate_condition(
    manager: &mut ConditionManager<'_>,
    destination: &str,
    source: Option<&Condition>,
) -> bool {
    let Some(source) = source else {
        return false;
    };

    if source.is_true() {
        manager.mark_true(destination);
    } else if source.is_false() {
        manager.mark_false(destination, &source.reason, &source.message);
    } else {
        manager.mark_unknown(destination, &source.reason, &source.message);
    }

    source.is_true()
}

/// Aggregate an arbitrary list of child conditions into one `Ready`
///
/// Children are ordered as given, so the first failing child is the one
/// reported. Returns the aggregate and the children as recorded.
///
/// A child of type `Ready` would collide with the aggregate, so it is left
/// out of the aggregate and returned unchanged at the end of the children.
pub fn summarize_child_conditions(conditions: Vec<Condition>) -> (Condition, Vec<Condition>) {
    let (colliding, conditions): (Vec<_>, Vec<_>) = conditions
        .into_iter()
        .partition(|c| c.type_ == CONDITION_READY);
    if !colliding.is_empty() {
        warn!(
            count = colliding.len(),
            "child condition named Ready excluded from summary"
        );
    }

    let set = ConditionSet::living(conditions.iter().map(|c| c.type_.clone()));
    let mut status = Status::default();
    {
        let mut manager = set.manage(&mut status);
        manager.initialize_conditions();
        for condition in conditions {
            manager.set_condition(condition);
        }
    }

    let mut children = Vec::with_capacity(status.conditions.len());
    let mut ready = None;
    for condition in status.conditions {
        if condition.type_ == CONDITION_READY {
            ready = Some(condition);
        } else {
            children.push(condition);
        }
    }
    children.extend(colliding);

    (
        ready.unwrap_or_else(|| Condition::success(CONDITION_READY)),
        children,
    )
}

/// Returns true once `Ready` or `Succeeded` is `True` or `False`
///
/// `Ready` is checked first; `Succeeded` only counts when `Ready` is absent.
pub fn is_status_final(conditions: &[Condition]) -> bool {
    let find = |t: &str| conditions.iter().find(|c| c.type_ == t);
    find(CONDITION_READY)
        .or_else(|| find(CONDITION_SUCCEEDED))
        .is_some_and(|c| !c.is_unknown())
}
