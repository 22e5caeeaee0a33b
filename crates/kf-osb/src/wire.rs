//! Broker responses as delivered by the broker client

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response to a request that may complete asynchronously
pub trait AsyncResponse {
    /// Whether the broker accepted the request for asynchronous processing
    fn is_async(&self) -> bool;

    /// Handle for polling the operation, when the broker gave one
    fn operation_key(&self) -> Option<&str>;
}

macro_rules! async_response {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            /// Whether the request completes asynchronously
            #[serde(rename = "async", default)]
            pub is_async: bool,

            /// Broker-assigned handle for the operation
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub operation_key: Option<String>,
        }

        impl $name {
            /// A response for a request that already completed
            pub fn completed() -> Self {
                Self::default()
            }

            /// A response for a request that is still running
            pub fn pending(operation_key: Option<&str>) -> Self {
                Self {
                    is_async: true,
                    operation_key: operation_key.map(str::to_string),
                }
            }
        }

        impl AsyncResponse for $name {
            fn is_async(&self) -> bool {
                self.is_async
            }

            fn operation_key(&self) -> Option<&str> {
                self.operation_key.as_deref()
            }
        }
    };
}

async_response!(
    /// Response to a provision request
    ProvisionResponse
);
async_response!(
    /// Response to a deprovision request
    DeprovisionResponse
);
async_response!(
    /// Response to a bind request
    BindResponse
);
async_response!(
    /// Response to an unbind request
    UnbindResponse
);

/// State reported by a last-operation poll
///
/// Brokers are free to send anything; strings outside the three defined
/// states are kept so they can be reported.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum LastOperationState {
    /// `"in progress"`
    InProgress,
    /// `"succeeded"`
    Succeeded,
    /// `"failed"`
    Failed,
    /// Any other value
    Other(String),
}

impl LastOperationState {
    /// The wire value
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for LastOperationState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "in progress" => Self::InProgress,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for LastOperationState {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<LastOperationState> for String {
    fn from(state: LastOperationState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for LastOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response to a last-operation poll
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LastOperationResponse {
    /// Current state of the operation
    pub state: LastOperationState,

    /// Optional human-readable progress from the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LastOperationResponse {
    /// A poll response with the given state and no description
    pub fn new(state: impl Into<LastOperationState>) -> Self {
        Self {
            state: state.into(),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
