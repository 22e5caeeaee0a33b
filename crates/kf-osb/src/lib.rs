//! Open Service Broker operation tracking
//!
//! Translates broker responses for provision, deprovision, bind and unbind
//! into a condition update plus the next recorded operation state. Each
//! operation has a synchronous entry point ([`track_response`]) for the
//! first request and a polling entry point ([`track_last_operation`]) for
//! asynchronous operations.
//!
//! The recorded state is a [`BrokerStatus`], which holds at most one
//! [`InstanceState`] or [`BindingState`]. Every tracked call leaves exactly
//! one state recorded.

#![deny(missing_docs)]

pub mod error;
pub mod operation;
pub mod state;
pub mod tracker;
pub mod wire;

pub use error::{ErrorClass, OsbError};
pub use operation::{BindingOperation, InstanceOperation, Operation, OperationPhase};
pub use state::{BindingOsbStatus, BindingState, BrokerStatus, InstanceState, OsbState, OsbStatus};
pub use tracker::{format_operation_message, track_last_operation, track_response, Transition};
pub use wire::{
    AsyncResponse, BindResponse, DeprovisionResponse, LastOperationResponse, LastOperationState,
    ProvisionResponse, UnbindResponse,
};
