//! Error types for the api-caller service

use api_caller_runtime::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by [`ApiCaller`](crate::ApiCaller) itself
///
/// HTTP failures are not errors at this level: they are recorded in the
/// request's state as an [`ApiErrorResponse`](api_caller_core::envelope::ApiErrorResponse).
#[derive(Debug, Error)]
pub enum ApiCallerError {
    /// The underlying store rejected or timed out an operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
