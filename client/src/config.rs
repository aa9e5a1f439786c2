//! Service configuration
//!
//! Values given through an [`ApiConnector`](crate::ApiConnector) take
//! precedence over the ones configured here.

use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the default base URL
pub const DEFAULT_URL_ENV: &str = "API_CALLER_DEFAULT_URL";

/// Environment variable holding the action broadcast capacity
pub const BROADCAST_CAPACITY_ENV: &str = "API_CALLER_BROADCAST_CAPACITY";

/// Base URL used when neither the descriptor nor the connector names one
pub const DEFAULT_API_URL: &str = "/";

/// Errors reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Configuration for [`ApiCaller`](crate::ApiCaller)
///
/// # Example
///
/// ```
/// use api_caller::ApiCallerConfig;
///
/// let config = ApiCallerConfig::default()
///     .with_default_api_url("https://api.example.com")
///     .with_broadcast_capacity(64);
/// assert_eq!(config.default_api_url, "https://api.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallerConfig {
    /// Base URL for descriptors without `api`
    pub default_api_url: String,
    /// Capacity of the store's action broadcast channel
    pub broadcast_capacity: usize,
    /// `User-Agent` sent by the default transport
    pub user_agent: Option<String>,
    /// How long [`ApiCaller::shutdown`](crate::ApiCaller::shutdown) waits for in-flight requests
    pub shutdown_timeout: Duration,
}

impl Default for ApiCallerConfig {
    fn default() -> Self {
        Self {
            default_api_url: DEFAULT_API_URL.to_string(),
            broadcast_capacity: 16,
            user_agent: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiCallerConfig {
    /// Read overrides from the process environment
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `API_CALLER_BROADCAST_CAPACITY`
    /// is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(DEFAULT_URL_ENV).filter(|url| !url.is_empty()) {
            config.default_api_url = url;
        }

        if let Some(raw) = lookup(BROADCAST_CAPACITY_ENV) {
            config.broadcast_capacity = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: BROADCAST_CAPACITY_ENV,
                    value: raw,
                })?;
        }

        Ok(config)
    }

    /// Set the default base URL
    #[must_use]
    pub fn with_default_api_url(mut self, url: impl Into<String>) -> Self {
        self.default_api_url = url.into();
        self
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the `User-Agent` for the default transport
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
