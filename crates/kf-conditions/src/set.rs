//! Condition sets: which conditions a resource reports and how they aggregate

use kf_common::{CONDITION_READY, CONDITION_SUCCEEDED};

use crate::manager::ConditionManager;
use crate::status::HasConditions;

/// How the aggregate condition follows its dependents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregation {
    /// Continuously reconciled resources; aggregate type `Ready`
    Living,
    /// One-shot operations; aggregate type `Succeeded`, frozen once terminal
    ///
    /// Once `Succeeded` is `True` or `False`, dependent writes no longer touch
    /// it: a dependent turning `False` after success leaves `Succeeded=True`
    /// until `reinitialize` is called.
    Batch,
}

/// Registration table of a resource's dependent condition types
///
/// Each resource declares its own enum and passes it to
/// [`ConditionSet::living_for`] or [`ConditionSet::batch_for`], so condition
/// names are not shared as loose string constants.
pub trait ConditionTable: Copy + 'static {
    /// Dependents in declaration order; the order breaks ties when
    /// picking which failure the aggregate reports
    const DEPENDENTS: &'static [Self];

    /// Wire name of the condition type
    fn as_str(self) -> &'static str;
}

/// An ordered set of dependent condition types plus one aggregate type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionSet {
    aggregation: Aggregation,
    happy: String,
    dependents: Vec<String>,
}

impl ConditionSet {
    /// Create a `Ready` set over the given dependents
    pub fn living<I, T>(dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::build(Aggregation::Living, CONDITION_READY, dependents)
    }

    /// Create a `Succeeded` set over the given dependents
    pub fn batch<I, T>(dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::build(Aggregation::Batch, CONDITION_SUCCEEDED, dependents)
    }

    /// Create a `Ready` set from a resource's condition table
    pub fn living_for<T: ConditionTable>() -> Self {
        Self::living(T::DEPENDENTS.iter().map(|t| t.as_str()))
    }

    /// Create a `Succeeded` set from a resource's condition table
    pub fn batch_for<T: ConditionTable>() -> Self {
        Self::batch(T::DEPENDENTS.iter().map(|t| t.as_str()))
    }

    fn build<I, T>(aggregation: Aggregation, happy: &str, dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for t in dependents {
            let t = t.as_ref();
            if t != happy && !unique.iter().any(|u| u == t) {
                unique.push(t.to_string());
            }
        }

        Self {
            aggregation,
            happy: happy.to_string(),
            dependents: unique,
        }
    }

    /// The aggregation semantics
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// The aggregate condition type (`Ready` or `Succeeded`)
    pub fn happy_type(&self) -> &str {
        &self.happy
    }

    /// Dependent condition types in declaration order
    pub fn dependents(&self) -> &[String] {
        &self.dependents
    }

    /// Returns true if `t` is one of the dependents
    pub fn is_dependent(&self, t: &str) -> bool {
        self.dependents.iter().any(|d| d == t)
    }

    /// Bind the set to a status for reading and writing conditions
    pub fn manage(self, status: &mut dyn HasConditions) -> ConditionManager<'_> {
        ConditionManager::new(self, status)
    }
}
