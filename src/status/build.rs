//! Status of a Build, a one-shot image build run as a Tekton TaskRun

use chrono::{DateTime, Utc};
use kf_common::{Condition, CONDITION_SUCCEEDED};
use kf_conditions::{
    propagate_condition, ConditionManager, ConditionSet, ConditionTable, HasConditions,
    SingleConditionManager,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::child::ObservedChild;

/// Task result the build step writes the pushed image reference to
pub const IMAGE_RESULT: &str = "IMAGE";

/// Dependent conditions of a Build
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildCondition {
    /// The Space the build runs in is usable
    SpaceReady,
    /// The uploaded source is available
    SourcePackageReady,
    /// The TaskRun doing the build finished
    TaskRunReady,
}

impl ConditionTable for BuildCondition {
    const DEPENDENTS: &'static [Self] = &[
        Self::SpaceReady,
        Self::SourcePackageReady,
        Self::TaskRunReady,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::SpaceReady => "SpaceReady",
            Self::SourcePackageReady => "SourcePackageReady",
            Self::TaskRunReady => "TaskRunReady",
        }
    }
}

/// Status of a Build
///
/// `Succeeded` aggregates the dependents and is final once it leaves
/// `Unknown`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Conditions representing the state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed generation for optimistic concurrency
    #[serde(default)]
    pub observed_generation: i64,

    /// Image produced by the build, set once it succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Name of the TaskRun doing the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,

    /// When the TaskRun started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// When the TaskRun finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl HasConditions for BuildStatus {
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

fn parse_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

impl BuildStatus {
    /// Condition manager for the Build's condition set
    pub fn manage(&mut self) -> ConditionManager<'_> {
        ConditionSet::batch_for::<BuildCondition>().manage(self)
    }

    /// Fill in absent conditions
    pub fn initialize_conditions(&mut self) {
        self.manage().initialize_conditions();
    }

    /// The aggregate condition
    pub fn succeeded_condition(&self) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.type_ == CONDITION_SUCCEEDED)
    }

    /// Returns true only when `Succeeded` is `True`
    pub fn succeeded(&self) -> bool {
        self.succeeded_condition().is_some_and(Condition::is_true)
    }

    /// Returns true once `Succeeded` is `True` or `False`
    pub fn is_done(&self) -> bool {
        self.succeeded_condition()
            .is_some_and(|c| !c.is_unknown())
    }

    /// Mark the Space usable
    pub fn mark_space_healthy(&mut self) {
        self.manage().mark_true(BuildCondition::SpaceReady.as_str());
    }

    /// Mark the Space unusable
    pub fn mark_space_unhealthy(&mut self, reason: &str, message: &str) {
        self.manage()
            .mark_false(BuildCondition::SpaceReady.as_str(), reason, message);
    }

    /// Condition driven by the source package
    pub fn source_package_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BuildCondition::SourcePackageReady.as_str(),
            "SourcePackage",
        )
    }

    /// Condition driven by the TaskRun
    pub fn task_run_condition(&mut self) -> SingleConditionManager<'_> {
        SingleConditionManager::new(
            self.manage(),
            BuildCondition::TaskRunReady.as_str(),
            "TaskRun",
        )
    }

    /// Copy the source package's `Succeeded` into `SourcePackageReady`
    pub fn propagate_source_package_status(&mut self, package: Option<&ObservedChild>) {
        match package.and_then(|p| p.condition(CONDITION_SUCCEEDED)) {
            Some(succeeded) => {
                propagate_condition(
                    &mut self.manage(),
                    BuildCondition::SourcePackageReady.as_str(),
                    Some(succeeded),
                );
            }
            None => self.source_package_condition().mark_reconciliation_pending(),
        }
    }

    /// Copy the TaskRun's progress into the status
    ///
    /// The image is only recorded once the TaskRun has succeeded.
    pub fn propagate_task_run_status(&mut self, task_run: Option<&ObservedChild>) {
        let Some(task_run) = task_run else {
            self.task_run_condition().mark_reconciliation_pending();
            return;
        };

        self.build_name = Some(task_run.name.clone());
        self.start_time = parse_time(task_run.status_field("startTime"));
        self.completion_time = parse_time(task_run.status_field("completionTime"));

        let Some(succeeded) = task_run.condition(CONDITION_SUCCEEDED) else {
            self.task_run_condition().mark_reconciliation_pending();
            return;
        };

        let done = propagate_condition(
            &mut self.manage(),
            BuildCondition::TaskRunReady.as_str(),
            Some(succeeded),
        );
        if done {
            self.image = task_run
                .named_result("taskResults", IMAGE_RESULT)
                .map(str::to_string);
        }
    }
}
