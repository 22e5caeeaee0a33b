//! Structured logging initialization
//!
//! Sets up a `tracing` subscriber with an `EnvFilter` and either JSON or
//! human-readable output. Status propagation code only emits events; the
//! process hosting the reconcilers calls [`init_logging`] once at startup.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::StatusConfig;

/// Default filter directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,kf=debug,kube=info";

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter {
        /// The rejected directive
        filter: String,
        /// Parser error
        message: String,
    },

    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for logging initialization
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive (e.g., "info,kf=debug")
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: true,
        }
    }
}

impl From<&StatusConfig> for LoggingConfig {
    fn from(config: &StatusConfig) -> Self {
        Self {
            filter: config.log_filter.clone(),
            json: true,
        }
    }
}

/// Build the filter for a configuration without installing anything
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        message: e.to_string(),
    })
}

/// Initialize the global tracing subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(&config)?;

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
    });
    let text_layer = (!config.json).then(|| tracing_subscriber::fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::SubscriberInit(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter, DEFAULT_LOG_FILTER);
        assert!(config.json);
    }

    #[test]
    fn test_build_filter_accepts_directives() {
        let config = LoggingConfig {
            filter: "warn,kf_osb=trace".to_string(),
            json: false,
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let config = LoggingConfig {
            filter: "kf=notalevel".to_string(),
            json: true,
        };
        let err = build_filter(&config).unwrap_err();
        assert!(err.to_string().contains("invalid log filter"));
    }

    #[test]
    fn test_second_init_fails() {
        // The first call may race with other tests installing a subscriber,
        // but the second one can never succeed.
        let _ = init_logging(LoggingConfig::default());
        assert!(init_logging(LoggingConfig::default()).is_err());
    }
}
