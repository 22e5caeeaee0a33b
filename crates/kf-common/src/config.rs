//! Environment configuration for status reconciliation
//!
//! Provides trait-based access to environment variables, enabling
//! dependency injection and mocking for tests.

use std::time::Duration;

use crate::telemetry::DEFAULT_LOG_FILTER;
use crate::Error;

/// Environment variable holding the cluster-wide default route domain
pub const ENV_DEFAULT_DOMAIN: &str = "KF_DEFAULT_DOMAIN";

/// Environment variable holding the broker operation timeout in seconds
pub const ENV_OPERATION_TIMEOUT_SECS: &str = "KF_OPERATION_TIMEOUT_SECS";

/// Environment variable holding the log filter
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Domain used for routes that don't specify one
pub const DEFAULT_DOMAIN: &str = "example.com";

/// Time a condition may stay unresolved before it is reported as timed out
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Trait for reading configuration from the process environment
///
/// This abstracts reading from environment variables, enabling
/// proper unit testing without manipulating global state.
#[cfg_attr(test, mockall::automock)]
pub trait EnvSource: Send + Sync {
    /// Read a single variable, `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// Default implementation that reads from environment variables
#[derive(Clone, Default)]
pub struct OsEnv;

impl EnvSource for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Settings that status propagation callers need
#[derive(Debug, Clone, PartialEq)]
pub struct StatusConfig {
    /// Domain used to qualify route bindings without one
    pub default_domain: String,

    /// How long a condition may make no progress before erroring
    pub operation_timeout: Duration,

    /// Filter directive for logging
    pub log_filter: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            default_domain: DEFAULT_DOMAIN.to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StatusConfig {
    /// Load configuration, falling back to defaults for unset variables
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(domain) = env.var(ENV_DEFAULT_DOMAIN) {
            let domain = domain.trim();
            if domain.is_empty() {
                return Err(Error::validation_for_field(
                    ENV_DEFAULT_DOMAIN,
                    "default domain must not be empty",
                ));
            }
            config.default_domain = domain.to_string();
        }

        if let Some(secs) = env.var(ENV_OPERATION_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::validation_for_field(
                    ENV_OPERATION_TIMEOUT_SECS,
                    format!("expected a whole number of seconds, got {secs:?}"),
                )
            })?;
            config.operation_timeout = Duration::from_secs(secs);
        }

        if let Some(filter) = env.var(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
