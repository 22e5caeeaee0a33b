//! Reads and writes conditions on a status while keeping the aggregate consistent

use kf_common::{Condition, ConditionStatus};
use tracing::{debug, warn};

use crate::set::{Aggregation, ConditionSet};
use crate::status::HasConditions;

/// Manages the conditions of one status under one [`ConditionSet`]
///
/// Dependent conditions are written through the `mark_*` methods; the
/// aggregate is never written directly and is recomputed after every change.
pub struct ConditionManager<'a> {
    set: ConditionSet,
    status: &'a mut dyn HasConditions,
}

impl<'a> ConditionManager<'a> {
    /// Bind a set to a status
    pub fn new(set: ConditionSet, status: &'a mut dyn HasConditions) -> Self {
        Self { set, status }
    }

    /// The set this manager enforces
    pub fn condition_set(&self) -> &ConditionSet {
        &self.set
    }

    /// Current value of a condition, `None` if it was never set
    pub fn get_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.status
            .conditions()
            .iter()
            .find(|c| c.type_ == condition_type)
    }

    /// The aggregate condition, if present
    pub fn happy_condition(&self) -> Option<&Condition> {
        self.get_condition(self.set.happy_type())
    }

    /// Returns true if the aggregate is `True`
    pub fn is_happy(&self) -> bool {
        self.happy_condition().is_some_and(Condition::is_true)
    }

    /// Write a condition and recompute the aggregate
    ///
    /// Writes to the aggregate type are refused. The transition time of an
    /// existing condition is kept when its status, reason and message are
    /// unchanged.
    pub fn set_condition(&mut self, condition: Condition) {
        if condition.type_ == self.set.happy_type() {
            warn!(
                condition = %condition.type_,
                status = %condition.status,
                "refusing to set aggregate condition directly"
            );
            return;
        }

        let dependent = self.set.is_dependent(&condition.type_);
        self.write(condition);
        if dependent {
            self.recompute();
        }
    }

    /// Set a condition to `True`
    pub fn mark_true(&mut self, condition_type: &str) {
        self.set_condition(Condition::success(condition_type));
    }

    /// Set a condition to `False` with a reason and message
    pub fn mark_false(
        &mut self,
        condition_type: &str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(Condition::new(
            condition_type,
            ConditionStatus::False,
            reason,
            message,
        ));
    }

    /// Set a condition to `Unknown` with a reason and message
    pub fn mark_unknown(
        &mut self,
        condition_type: &str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(Condition::new(
            condition_type,
            ConditionStatus::Unknown,
            reason,
            message,
        ));
    }

    /// Fill in the aggregate and every dependent that is absent
    ///
    /// Absent dependents start `True` when the aggregate is already `True`
    /// and `Unknown` otherwise. Conditions that are present are untouched.
    pub fn initialize_conditions(&mut self) {
        let happy_type = self.set.happy_type().to_string();
        let initial = match self.get_condition(&happy_type).map(|c| c.status) {
            Some(ConditionStatus::True) => ConditionStatus::True,
            Some(_) => ConditionStatus::Unknown,
            None => {
                self.write(Condition::new(
                    happy_type.as_str(),
                    ConditionStatus::Unknown,
                    "",
                    "",
                ));
                ConditionStatus::Unknown
            }
        };

        let missing: Vec<String> = self
            .set
            .dependents()
            .iter()
            .filter(|t| self.get_condition(t).is_none())
            .cloned()
            .collect();
        for t in missing {
            self.write(Condition::new(t, initial, "", ""));
        }

        self.recompute();
    }

    /// Drop the aggregate and every dependent, then initialize again
    ///
    /// This is the only way to move a terminal `Batch` aggregate.
    pub fn reinitialize(&mut self) {
        let happy_type = self.set.happy_type().to_string();
        let set = &self.set;
        self.status
            .conditions_mut()
            .retain(|c| c.type_ != happy_type && !set.is_dependent(&c.type_));
        self.initialize_conditions();
    }

    fn write(&mut self, mut condition: Condition) {
        let conditions = self.status.conditions_mut();
        match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) => {
                if existing.same_state(&condition) {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => {
                conditions.push(condition);
                conditions.sort_by(|a, b| a.type_.cmp(&b.type_));
            }
        }
    }

    fn recompute(&mut self) {
        let previous = self.happy_condition().cloned();
        if self.set.aggregation() == Aggregation::Batch
            && previous.as_ref().is_some_and(|c| !c.is_unknown())
        {
            return;
        }

        let next = self.aggregate();
        if previous.as_ref().map(|c| c.status) != Some(next.status) {
            debug!(
                condition = %next.type_,
                from = %previous.as_ref().map(|c| c.status).unwrap_or_default(),
                to = %next.status,
                reason = %next.reason,
                "aggregate condition changed"
            );
        }
        self.write(next);
    }

    /// First `False` wins, then first `Unknown`, in declared order
    fn aggregate(&self) -> Condition {
        let happy_type = self.set.happy_type();
        let mut first_unknown: Option<Condition> = None;

        for t in self.set.dependents() {
            match self.get_condition(t) {
                Some(c) if c.is_false() => {
                    return Condition::new(happy_type, ConditionStatus::False, &c.reason, &c.message);
                }
                Some(c) if c.is_true() => {}
                Some(c) => {
                    if first_unknown.is_none() {
                        first_unknown = Some(Condition::new(
                            happy_type,
                            ConditionStatus::Unknown,
                            &c.reason,
                            &c.message,
                        ));
                    }
                }
                None => {
                    if first_unknown.is_none() {
                        first_unknown =
                            Some(Condition::new(happy_type, ConditionStatus::Unknown, "", ""));
                    }
                }
            }
        }

        first_unknown.unwrap_or_else(|| Condition::success(happy_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use rstest::rstest;

    fn living() -> ConditionSet {
        ConditionSet::living(["A", "B", "C"])
    }

    fn batch() -> ConditionSet {
        ConditionSet::batch(["A", "B"])
    }

    fn status_of(status: &Status, t: &str) -> Option<ConditionStatus> {
        status
            .conditions
            .iter()
            .find(|c| c.type_ == t)
            .map(|c| c.status)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    mod initialize {
        use super::*;

        #[test]
        fn test_fills_every_absent_condition_with_unknown() {
            let mut status = Status::default();
            living().manage(&mut status).initialize_conditions();

            let types: Vec<&str> = status.conditions.iter().map(|c| c.type_.as_str()).collect();
            assert_eq!(types, ["A", "B", "C", "Ready"]);
            assert!(status.conditions.iter().all(Condition::is_unknown));
        }

        #[test]
        fn test_keeps_existing_conditions() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.mark_false("B", "Broken", "b is broken");
            manager.initialize_conditions();

            let b = manager.get_condition("B").unwrap();
            assert_eq!(b.reason, "Broken");
            assert!(manager.get_condition("Ready").unwrap().is_false());
        }

        #[test]
        fn test_new_dependents_start_true_when_already_happy() {
            let mut status = Status {
                conditions: vec![Condition::success("A"), Condition::success("Ready")],
                observed_generation: 1,
            };
            living().manage(&mut status).initialize_conditions();

            assert_eq!(status_of(&status, "B"), Some(ConditionStatus::True));
            assert_eq!(status_of(&status, "C"), Some(ConditionStatus::True));
            assert_eq!(status_of(&status, "Ready"), Some(ConditionStatus::True));
        }

        #[test]
        fn test_is_idempotent() {
            let mut status = Status::default();
            living().manage(&mut status).initialize_conditions();
            let first = status.clone();
            living().manage(&mut status).initialize_conditions();
            assert_eq!(status, first);
        }
    }

    // =========================================================================
    // Living aggregation
    // =========================================================================

    mod living_aggregation {
        use super::*;

        #[test]
        fn test_all_true_is_happy() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_true("A");
            manager.mark_true("B");
            assert!(!manager.is_happy());
            manager.mark_true("C");
            assert!(manager.is_happy());

            let ready = manager.happy_condition().unwrap();
            assert!(ready.reason.is_empty());
            assert!(ready.message.is_empty());
        }

        #[test]
        fn test_false_outranks_unknown() {
            let mut status = Status::default();
            let mut manager = ConditionSet::living(["A", "B"]).manage(&mut status);
            manager.mark_unknown("B", "Waiting", "b is waiting");
            manager.mark_false("A", "Failed", "a failed");

            let ready = manager.happy_condition().unwrap();
            assert!(ready.is_false());
            assert_eq!(ready.reason, "Failed");
            assert_eq!(ready.message, "a failed");
        }

        #[test]
        fn test_first_false_in_declared_order_wins() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_false("C", "CFailed", "c");
            manager.mark_false("B", "BFailed", "b");

            assert_eq!(manager.happy_condition().unwrap().reason, "BFailed");
        }

        #[test]
        fn test_first_unknown_reason_propagates() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_true("A");
            manager.mark_unknown("C", "CWaiting", "c");
            manager.mark_unknown("B", "BWaiting", "b");

            let ready = manager.happy_condition().unwrap();
            assert!(ready.is_unknown());
            assert_eq!(ready.reason, "BWaiting");
        }

        #[test]
        fn test_recovers_when_failure_clears() {
            let mut status = Status::default();
            let mut manager = ConditionSet::living(["A"]).manage(&mut status);
            manager.mark_false("A", "Failed", "a failed");
            assert!(!manager.is_happy());
            manager.mark_true("A");
            assert!(manager.is_happy());
        }

        #[test]
        fn test_empty_set_is_happy() {
            let mut status = Status::default();
            let mut manager = ConditionSet::living(Vec::<String>::new()).manage(&mut status);
            manager.initialize_conditions();
            assert!(manager.is_happy());
        }
    }

    // =========================================================================
    // Batch aggregation
    // =========================================================================

    mod batch_aggregation {
        use super::*;

        #[test]
        fn test_terminal_aggregate_is_frozen() {
            let mut status = Status::default();
            let mut manager = batch().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_false("A", "Failed", "a failed");
            assert!(manager.get_condition("Succeeded").unwrap().is_false());

            manager.mark_true("A");
            manager.mark_true("B");
            let succeeded = manager.get_condition("Succeeded").unwrap();
            assert!(succeeded.is_false());
            assert_eq!(succeeded.reason, "Failed");
            assert!(manager.get_condition("A").unwrap().is_true());
        }

        #[test]
        fn test_failure_after_success_leaves_aggregate_true() {
            let mut status = Status::default();
            let mut manager = batch().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_true("A");
            manager.mark_true("B");
            assert!(manager.is_happy());

            manager.mark_false("B", "Evicted", "pod evicted");
            assert!(manager.is_happy());
            assert!(manager.get_condition("B").unwrap().is_false());
        }

        #[test]
        fn test_reinitialize_unfreezes() {
            let mut status = Status::default();
            let mut manager = batch().manage(&mut status);
            manager.mark_false("A", "Failed", "a failed");
            manager.reinitialize();
            assert!(manager.get_condition("Succeeded").unwrap().is_unknown());

            manager.mark_true("A");
            manager.mark_true("B");
            assert!(manager.is_happy());
        }

        #[test]
        fn test_unknown_aggregate_keeps_recomputing() {
            let mut status = Status::default();
            let mut manager = batch().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_unknown("A", "Running", "still going");
            assert_eq!(manager.happy_condition().unwrap().reason, "Running");
            manager.mark_true("A");
            manager.mark_true("B");
            assert!(manager.is_happy());
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    mod writes {
        use super::*;

        #[test]
        fn test_aggregate_cannot_be_marked() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_true("Ready");
            manager.mark_false("Ready", "Manual", "nope");
            assert!(manager.happy_condition().unwrap().is_unknown());
            assert!(manager.happy_condition().unwrap().reason.is_empty());
        }

        #[test]
        fn test_non_dependent_leaves_aggregate_alone() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.initialize_conditions();
            manager.mark_false("Route0Ready", "Missing", "gone");

            assert!(manager.get_condition("Route0Ready").unwrap().is_false());
            let ready = manager.happy_condition().unwrap();
            assert!(ready.is_unknown());
            assert!(ready.reason.is_empty());
        }

        #[test]
        fn test_unchanged_condition_keeps_transition_time() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.mark_false("A", "Failed", "a failed");
            let before = manager.get_condition("A").unwrap().last_transition_time;
            let old = before - chrono::Duration::minutes(5);
            manager
                .status
                .conditions_mut()
                .iter_mut()
                .for_each(|c| c.last_transition_time = old);

            manager.mark_false("A", "Failed", "a failed");
            assert_eq!(manager.get_condition("A").unwrap().last_transition_time, old);
            assert_eq!(manager.happy_condition().unwrap().last_transition_time, old);

            manager.mark_false("A", "Failed", "different");
            assert!(manager.get_condition("A").unwrap().last_transition_time > old);
        }

        #[test]
        fn test_conditions_stay_sorted_and_unique() {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            manager.mark_true("C");
            manager.mark_true("A");
            manager.mark_true("C");
            manager.mark_true("B");

            let types: Vec<&str> = status.conditions.iter().map(|c| c.type_.as_str()).collect();
            assert_eq!(types, ["A", "B", "C", "Ready"]);
        }

        #[rstest]
        #[case::all_true(&[ConditionStatus::True, ConditionStatus::True, ConditionStatus::True], ConditionStatus::True)]
        #[case::false_beats_unknown(&[ConditionStatus::False, ConditionStatus::Unknown, ConditionStatus::True], ConditionStatus::False)]
        #[case::unknown_beats_true(&[ConditionStatus::True, ConditionStatus::Unknown, ConditionStatus::True], ConditionStatus::Unknown)]
        #[case::late_false(&[ConditionStatus::Unknown, ConditionStatus::Unknown, ConditionStatus::False], ConditionStatus::False)]
        fn test_aggregate_is_function_of_dependents(
            #[case] values: &[ConditionStatus],
            #[case] expected: ConditionStatus,
        ) {
            let mut status = Status::default();
            let mut manager = living().manage(&mut status);
            for (t, value) in ["A", "B", "C"].iter().zip(values) {
                manager.set_condition(Condition::new(*t, *value, "Reason", "msg"));
            }
            assert_eq!(manager.happy_condition().unwrap().status, expected);
        }
    }
}
