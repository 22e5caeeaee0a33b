//! Turns broker responses into condition updates and recorded states
//!
//! Both entry points are pure: the same inputs always yield the same
//! [`Transition`], so replaying the last observation after a restart is safe.

use kf_common::ConditionStatus;
use kf_conditions::ConditionUpdate;
use tracing::{debug, warn};

use crate::error::{ErrorClass, OsbError};
use crate::operation::{Operation, OperationPhase};
use crate::state::BrokerStatus;
use crate::wire::{AsyncResponse, LastOperationResponse, LastOperationState};

/// Reason for a poll that failed with a non-retryable error
pub const REASON_POLLING_OPERATION: &str = "PollingOperation";

/// Reason for a poll reporting a state outside the broker API
pub const REASON_UNKNOWN_STATE: &str = "UnknownState";

/// The outcome of one tracked broker call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    /// Update for the condition that follows the operation
    pub condition: ConditionUpdate,

    /// State to record; `None` keeps the state already recorded
    pub state: Option<S>,
}

impl<S> Transition<S> {
    fn new(condition: ConditionUpdate, state: S) -> Self {
        Self {
            condition,
            state: Some(state),
        }
    }

    fn keep(condition: ConditionUpdate) -> Self {
        Self {
            condition,
            state: None,
        }
    }

    /// Status the condition will take
    pub fn status(&self) -> ConditionStatus {
        self.condition.status()
    }

    /// Write the chosen state into `status`
    pub fn record(self, status: &mut BrokerStatus<S>) -> ConditionUpdate {
        status.record(self.state);
        self.condition
    }
}

/// Track the response to a provision, deprovision, bind or unbind request
///
/// A retryable error is a plain failure here: the request has no recorded
/// operation to come back to.
pub fn track_response<O, R>(op: O, result: Result<&R, &OsbError>) -> Transition<O::State>
where
    O: Operation,
    R: AsyncResponse,
{
    match result {
        Err(err) if op.deletes() && err.classify() == ErrorClass::Deleted => {
            debug!(operation = %op, error = %err, "resource already gone at broker");
            succeeded(op)
        }
        Err(err) => {
            warn!(operation = %op, error = %err, "broker request failed");
            Transition::new(
                ConditionUpdate::failure(
                    op.in_progress_reason(),
                    format!("couldn't {}: {}", op.verb(), err),
                ),
                op.state(OperationPhase::Failed, None),
            )
        }
        Ok(response) if response.is_async() => Transition::new(
            ConditionUpdate::unknown(op.in_progress_reason(), "operation is pending"),
            op.state(
                OperationPhase::InProgress,
                response.operation_key().map(str::to_string),
            ),
        ),
        Ok(_) => succeeded(op),
    }
}

/// Track the result of polling an asynchronous operation
///
/// Retryable errors and in-progress polls keep the recorded state, so the
/// operation key is never lost. If nothing is recorded yet, the in-progress
/// state is recorded without a key.
pub fn track_last_operation<O: Operation>(
    op: O,
    recorded: &BrokerStatus<O::State>,
    result: Result<&LastOperationResponse, &OsbError>,
) -> Transition<O::State> {
    let still_running = |condition: ConditionUpdate| {
        if recorded.is_blank() {
            Transition::new(condition, op.state(OperationPhase::InProgress, None))
        } else {
            Transition::keep(condition)
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            return match err.classify() {
                ErrorClass::Retryable => {
                    debug!(operation = %op, error = %err, "retryable error while polling");
                    still_running(ConditionUpdate::unknown(
                        op.polling_reason(),
                        format!("temporary error while polling: {err}"),
                    ))
                }
                ErrorClass::Deleted if op.deletes() => {
                    debug!(operation = %op, error = %err, "resource already gone at broker");
                    succeeded(op)
                }
                ErrorClass::Deleted | ErrorClass::Terminal => {
                    warn!(operation = %op, error = %err, "polling broker operation failed");
                    failed(op, ConditionUpdate::failure(REASON_POLLING_OPERATION, err.to_string()))
                }
            };
        }
    };

    let progress = format_operation_message(response);
    match &response.state {
        LastOperationState::InProgress => {
            still_running(ConditionUpdate::unknown(op.in_progress_reason(), progress))
        }
        LastOperationState::Succeeded => succeeded(op),
        LastOperationState::Failed => {
            warn!(operation = %op, %progress, "broker operation failed");
            failed(
                op,
                ConditionUpdate::failure(
                    op.failed_reason(),
                    format!("{} failed: {}", op.verb(), progress),
                ),
            )
        }
        LastOperationState::Other(state) => {
            warn!(operation = %op, state = %state, "broker reported an unknown state");
            failed(
                op,
                ConditionUpdate::failure(REASON_UNKNOWN_STATE, format!("unknown state: {progress}")),
            )
        }
    }
}

/// `operation state: "<state>"` followed by the description when present
pub fn format_operation_message(response: &LastOperationResponse) -> String {
    let mut message = format!("operation state: {:?}", response.state.as_str());
    if let Some(description) = &response.description {
        message.push_str(&format!(" description: {description:?}"));
    }
    message
}

fn succeeded<O: Operation>(op: O) -> Transition<O::State> {
    Transition::new(
        ConditionUpdate::Success,
        op.state(OperationPhase::Succeeded, None),
    )
}

fn failed<O: Operation>(op: O, condition: ConditionUpdate) -> Transition<O::State> {
    Transition::new(condition, op.state(OperationPhase::Failed, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{BindingOperation, InstanceOperation};
    use crate::state::{BindingOsbStatus, BindingState, InstanceState, OsbState, OsbStatus};
    use crate::wire::{BindResponse, DeprovisionResponse, ProvisionResponse, UnbindResponse};
    use rstest::rstest;

    fn provisioning(key: &str) -> OsbStatus {
        OsbStatus::new(InstanceState::Provisioning(OsbState::with_key(Some(
            key.to_string(),
        ))))
    }

    fn apply<S: Clone>(status: &mut BrokerStatus<S>, t: &Transition<S>) {
        status.record(t.state.clone());
    }

    // =========================================================================
    // Synchronous responses
    // =========================================================================

    mod sync {
        use super::*;

        #[test]
        fn test_async_response_records_operation_key() {
            let resp = ProvisionResponse::pending(Some("op-1"));
            let t = track_response(InstanceOperation::Provision, Ok(&resp));

            assert_eq!(
                t.condition,
                ConditionUpdate::unknown("ProvisioningInstance", "operation is pending")
            );
            assert_eq!(
                t.state,
                Some(InstanceState::Provisioning(OsbState::with_key(Some(
                    "op-1".to_string()
                ))))
            );
        }

        #[test]
        fn test_sync_response_succeeds() {
            let resp = BindResponse::completed();
            let t = track_response(BindingOperation::Bind, Ok(&resp));
            assert_eq!(t.condition, ConditionUpdate::Success);
            assert_eq!(t.state, Some(BindingState::Bound(OsbState::default())));
        }

        #[rstest]
        #[case::conflict(409)]
        #[case::unavailable(503)]
        #[case::bad_request(400)]
        #[case::not_found_on_create(404)]
        fn test_provision_errors_fail(#[case] code: u16) {
            let err = OsbError::http(code);
            let t = track_response::<_, ProvisionResponse>(InstanceOperation::Provision, Err(&err));

            assert_eq!(t.status(), ConditionStatus::False);
            assert_eq!(t.condition.reason(), "ProvisioningInstance");
            assert_eq!(t.condition.message(), format!("couldn't provision: {err}"));
            assert_eq!(
                t.state,
                Some(InstanceState::ProvisionFailed(OsbState::default()))
            );
        }

        #[rstest]
        #[case::not_found(404)]
        #[case::gone(410)]
        fn test_removal_of_missing_resource_succeeds(#[case] code: u16) {
            let err = OsbError::http(code);

            let t = track_response::<_, DeprovisionResponse>(InstanceOperation::Deprovision, Err(&err));
            assert_eq!(t.condition, ConditionUpdate::Success);
            assert_eq!(t.state, Some(InstanceState::Deprovisioned(OsbState::default())));

            let t = track_response::<_, UnbindResponse>(BindingOperation::Unbind, Err(&err));
            assert_eq!(t.condition, ConditionUpdate::Success);
            assert_eq!(t.state, Some(BindingState::Unbound(OsbState::default())));
        }
    }

    // =========================================================================
    // Polling
    // =========================================================================

    mod poll {
        use super::*;

        #[rstest]
        #[case::conflict(409)]
        #[case::internal(500)]
        #[case::gateway(502)]
        #[case::unavailable(503)]
        fn test_retryable_error_keeps_operation_key(#[case] code: u16) {
            let mut status = provisioning("op-1");
            let before = status.clone();
            let err = OsbError::http(code);
            let t = track_last_operation(InstanceOperation::Provision, &status, Err(&err));

            assert_eq!(t.status(), ConditionStatus::Unknown);
            assert_eq!(t.condition.reason(), "ProvisionPolling");
            assert!(t.condition.message().starts_with("temporary error while polling: "));
            assert_eq!(t.state, None);

            apply(&mut status, &t);
            assert_eq!(status, before);
        }

        #[test]
        fn test_retryable_error_on_blank_records_in_progress() {
            let status = OsbStatus::blank();
            let t = track_last_operation(
                InstanceOperation::Deprovision,
                &status,
                Err(&OsbError::http(500)),
            );
            assert_eq!(
                t.state,
                Some(InstanceState::Deprovisioning(OsbState::default()))
            );
        }

        #[rstest]
        #[case::not_found(404)]
        #[case::gone(410)]
        fn test_deleted_during_removal_succeeds_regardless_of_prior(#[case] code: u16) {
            let err = OsbError::http(code);
            for prior in [
                OsbStatus::blank(),
                OsbStatus::new(InstanceState::Deprovisioning(OsbState::default())),
                OsbStatus::new(InstanceState::DeprovisionFailed(OsbState::default())),
            ] {
                let t = track_last_operation(InstanceOperation::Deprovision, &prior, Err(&err));
                assert_eq!(t.condition, ConditionUpdate::Success);
                assert_eq!(t.state, Some(InstanceState::Deprovisioned(OsbState::default())));
            }
        }

        #[test]
        fn test_deleted_during_provision_is_terminal() {
            let t = track_last_operation(
                InstanceOperation::Provision,
                &provisioning("op-1"),
                Err(&OsbError::http(404)),
            );
            assert_eq!(t.status(), ConditionStatus::False);
            assert_eq!(t.condition.reason(), "PollingOperation");
            assert_eq!(t.state, Some(InstanceState::ProvisionFailed(OsbState::default())));
        }

        #[test]
        fn test_in_progress_keeps_state_and_reports_progress() {
            let status = provisioning("op-1");
            let resp = LastOperationResponse::new("in progress").with_description("50% done");
            let t = track_last_operation(InstanceOperation::Provision, &status, Ok(&resp));

            assert_eq!(
                t.condition,
                ConditionUpdate::unknown(
                    "ProvisioningInstance",
                    r#"operation state: "in progress" description: "50% done""#
                )
            );
            assert_eq!(t.state, None);
        }

        #[test]
        fn test_succeeded_poll() {
            let status = BindingOsbStatus::new(BindingState::Unbinding(OsbState::default()));
            let resp = LastOperationResponse::new("succeeded");
            let t = track_last_operation(BindingOperation::Unbind, &status, Ok(&resp));
            assert_eq!(t.condition, ConditionUpdate::Success);
            assert_eq!(t.state, Some(BindingState::Unbound(OsbState::default())));
        }

        #[test]
        fn test_failed_poll() {
            let status = BindingOsbStatus::new(BindingState::Binding(OsbState::default()));
            let resp = LastOperationResponse::new("failed").with_description("quota");
            let t = track_last_operation(BindingOperation::Bind, &status, Ok(&resp));

            assert_eq!(
                t.condition,
                ConditionUpdate::failure(
                    "BindFailed",
                    r#"bind failed: operation state: "failed" description: "quota""#
                )
            );
            assert_eq!(t.state, Some(BindingState::BindFailed(OsbState::default())));
        }

        #[test]
        fn test_unrecognized_state_fails_closed() {
            let status = provisioning("op-1");
            let resp = LastOperationResponse::new("rebooting");
            let t = track_last_operation(InstanceOperation::Provision, &status, Ok(&resp));

            assert_eq!(
                t.condition,
                ConditionUpdate::failure("UnknownState", r#"unknown state: operation state: "rebooting""#)
            );
            assert_eq!(t.state, Some(InstanceState::ProvisionFailed(OsbState::default())));
        }
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    fn poll_inputs() -> Vec<Result<LastOperationResponse, OsbError>> {
        vec![
            Ok(LastOperationResponse::new("in progress")),
            Ok(LastOperationResponse::new("succeeded")),
            Ok(LastOperationResponse::new("failed")),
            Ok(LastOperationResponse::new("weird")),
            Err(OsbError::http(409)),
            Err(OsbError::http(404)),
            Err(OsbError::http(410)),
            Err(OsbError::http(500)),
            Err(OsbError::http(400)),
            Err(OsbError::other("dial tcp: connection refused")),
        ]
    }

    #[test]
    fn test_every_call_leaves_a_state_recorded() {
        for op in [InstanceOperation::Provision, InstanceOperation::Deprovision] {
            for input in poll_inputs() {
                let mut status = OsbStatus::blank();
                let t = track_last_operation(op, &status, input.as_ref());
                apply(&mut status, &t);
                assert!(!status.is_blank(), "{op} {input:?} left status blank");
            }
        }
    }

    #[test]
    fn test_replaying_an_observation_is_idempotent() {
        for op in [BindingOperation::Bind, BindingOperation::Unbind] {
            for input in poll_inputs() {
                let mut status =
                    BindingOsbStatus::new(op.state(OperationPhase::InProgress, Some("k".to_string())));
                let first = track_last_operation(op, &status, input.as_ref());
                apply(&mut status, &first);
                let after_first = status.clone();

                let second = track_last_operation(op, &status, input.as_ref());
                apply(&mut status, &second);
                assert_eq!(status, after_first, "{op} {input:?}");
                assert_eq!(first.condition, second.condition, "{op} {input:?}");
            }
        }
    }

    #[test]
    fn test_record_returns_condition() {
        let mut status = OsbStatus::blank();
        let resp = ProvisionResponse::pending(None);
        let update = track_response(InstanceOperation::Provision, Ok(&resp)).record(&mut status);
        assert_eq!(update.status(), ConditionStatus::Unknown);
        assert_eq!(
            status.state(),
            Some(&InstanceState::Provisioning(OsbState::default()))
        );
    }
}
