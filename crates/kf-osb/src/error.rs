//! Broker errors and how they are classified

use thiserror::Error;

/// Error returned by the broker client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OsbError {
    /// The broker answered with a non-success HTTP status
    #[error(
        "Status: {status_code}; ErrorMessage: {}; Description: {}",
        .error_message.as_deref().unwrap_or("<nil>"),
        .description.as_deref().unwrap_or("<nil>")
    )]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Machine-readable error from the broker body
        error_message: Option<String>,
        /// Human-readable description from the broker body
        description: Option<String>,
    },

    /// The request failed without an HTTP response
    #[error("{message}")]
    Other {
        /// Description of the failure
        message: String,
    },
}

/// How a tracked operation responds to a broker error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Contention or unavailability; try again later
    Retryable,
    /// The resource no longer exists at the broker
    Deleted,
    /// Anything else
    Terminal,
}

impl OsbError {
    /// An HTTP error with only a status code
    pub fn http(status_code: u16) -> Self {
        Self::Http {
            status_code,
            error_message: None,
            description: None,
        }
    }

    /// A non-HTTP failure
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Attach a description to an HTTP error
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        if let Self::Http { description, .. } = &mut self {
            *description = Some(text.into());
        }
        self
    }

    /// The HTTP status, if the broker answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => Some(*status_code),
            Self::Other { .. } => None,
        }
    }

    /// 409 and 5xx are retryable, 404 and 410 mean deleted
    pub fn classify(&self) -> ErrorClass {
        match self.status_code() {
            Some(409) => ErrorClass::Retryable,
            Some(code) if code >= 500 => ErrorClass::Retryable,
            Some(404) | Some(410) => ErrorClass::Deleted,
            _ => ErrorClass::Terminal,
        }
    }
}
