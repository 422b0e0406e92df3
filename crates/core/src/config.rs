//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services, rather than read from the environment during request handling,
//! which keeps behaviour consistent across multi-threaded runtimes and test
//! harnesses.

use std::time::Duration;

use crate::{ClinicError, ClinicResult};

/// Default upper bound on pooled connections, sized for the expected number
/// of simultaneous clinic staff.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    idle_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default pool sizing.
    pub fn new(database_url: impl Into<String>) -> ClinicResult<Self> {
        let database_url = database_url.into();
        if database_url.trim().is_empty() {
            return Err(ClinicError::Validation(
                "database URL cannot be empty".into(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        })
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

/// Parse the pool upper bound from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns the default.
pub fn max_connections_from_env_value(value: Option<String>) -> ClinicResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_MAX_CONNECTIONS),
        Some(v) => v.parse::<u32>().map_err(|_| {
            ClinicError::Validation(format!("invalid connection limit: {v:?}"))
        }),
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn rejects_empty_database_url() {
        let err = CoreConfig::new("  ").expect_err("expected validation failure");
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[test]
    fn max_connections_defaults_when_unset() {
        assert_eq!(
            max_connections_from_env_value(None).unwrap(),
            DEFAULT_MAX_CONNECTIONS
        );
        assert_eq!(
            max_connections_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_MAX_CONNECTIONS
        );
        assert_eq!(max_connections_from_env_value(Some("8".into())).unwrap(), 8);
    }
}
