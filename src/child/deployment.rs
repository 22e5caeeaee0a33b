//! Rollout state of Deployments and HorizontalPodAutoscalers

use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use kf_conditions::ConditionUpdate;

const DEPLOYMENT_REPLICA_FAILURE: &str = "ReplicaFailure";
const DEPLOYMENT_PROGRESSING: &str = "Progressing";
const REASON_PROGRESS_DEADLINE_EXCEEDED: &str = "ProgressDeadlineExceeded";

fn deployment_condition<'a>(
    deployment: &'a Deployment,
    condition_type: &str,
) -> Option<&'a DeploymentCondition> {
    deployment
        .status
        .as_ref()?
        .conditions
        .as_ref()?
        .iter()
        .find(|c| c.type_ == condition_type)
}

/// Condition update describing how far a Deployment's rollout has got
///
/// Checked in order: a replica failure, a spec the controller hasn't seen,
/// an exceeded progress deadline, then replicas still being updated,
/// terminated or started. A fully rolled out Deployment is a success.
pub fn rollout_update(deployment: &Deployment) -> ConditionUpdate {
    if let Some(failure) = deployment_condition(deployment, DEPLOYMENT_REPLICA_FAILURE) {
        if failure.status == "True" {
            return ConditionUpdate::failure(
                failure.reason.clone().unwrap_or_default(),
                failure.message.clone().unwrap_or_default(),
            );
        }
    }

    let name = deployment.metadata.name.as_deref().unwrap_or_default();
    let generation = deployment.metadata.generation.unwrap_or(0);
    let status = deployment.status.clone().unwrap_or_default();

    if generation > status.observed_generation.unwrap_or(0) {
        return ConditionUpdate::unknown(
            "GenerationOutOfDate",
            "waiting for deployment spec update to be observed",
        );
    }

    if deployment_condition(deployment, DEPLOYMENT_PROGRESSING)
        .is_some_and(|c| c.reason.as_deref() == Some(REASON_PROGRESS_DEADLINE_EXCEEDED))
    {
        return ConditionUpdate::failure(
            "DeadlineExceeded",
            format!("deployment {name:?} exceeded its progress deadline"),
        );
    }

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let replicas = status.replicas.unwrap_or(0);
    let updated = status.updated_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);

    if updated < desired {
        return ConditionUpdate::unknown(
            "UpdatingReplicas",
            format!(
                "waiting for deployment {name:?} rollout to finish: \
                 {updated} out of {desired} new replicas have been updated"
            ),
        );
    }

    if replicas > updated {
        return ConditionUpdate::unknown(
            "TerminatingOldReplicas",
            format!(
                "waiting for deployment {name:?} rollout to finish: \
                 {} old replicas are pending termination",
                replicas - updated
            ),
        );
    }

    if available < updated {
        return ConditionUpdate::unknown(
            "InitializingPods",
            format!(
                "waiting for deployment {name:?} rollout to finish: \
                 {available} of {updated} updated replicas are available"
            ),
        );
    }

    ConditionUpdate::Success
}

/// Condition update describing whether an autoscaler has settled
///
/// No autoscaler means there is nothing to wait for.
pub fn autoscaler_update(autoscaler: Option<&HorizontalPodAutoscaler>) -> ConditionUpdate {
    let Some(status) = autoscaler.and_then(|a| a.status.as_ref()) else {
        return ConditionUpdate::Success;
    };

    let current = status.current_replicas.unwrap_or(0);
    let desired = status.desired_replicas;

    let reason = match current.cmp(&desired) {
        std::cmp::Ordering::Greater => "ScalingDown",
        std::cmp::Ordering::Less => "ScalingUp",
        std::cmp::Ordering::Equal => return ConditionUpdate::Success,
    };
    let direction = if current > desired { "down" } else { "up" };

    ConditionUpdate::unknown(
        reason,
        format!(
            "waiting for autoscaler to finish scaling {direction}: \
             current replicas {current}, target replicas {desired}"
        ),
    )
}
