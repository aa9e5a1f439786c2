//! Collaborators supplied by the application
//!
//! An [`ApiConnector`] bundles the default base URL, the token source and the
//! global error handler. Every field is optional; missing ones fall back to
//! the service defaults.

use api_caller_core::envelope::{ApiFailure, ErrorHandling};
use api_caller_core::environment::TokenSource;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Token returned when no token source has been configured
pub const MISSING_TOKEN: &str =
    "[api-caller] Can't send requests with authorization, token provider not found";

/// Global handler for failures that are not handled locally
pub type ErrorHandler = Arc<dyn Fn(&ApiFailure) + Send + Sync>;

/// Handler used when the connector does not provide one
#[must_use]
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|failure: &ApiFailure| {
        tracing::warn!(
            status = failure.response.status,
            url = %failure.response.url,
            "Unhandled API error occurred, code: {}",
            failure.response.status
        );
    })
}

/// Optional collaborator bundle
///
/// # Example
///
/// ```
/// use api_caller::{ApiConnector, StaticToken};
///
/// let connector = ApiConnector::new()
///     .with_default_api_url("https://api.example.com")
///     .with_token_source(StaticToken::new("secret"))
///     .with_error_handler(|failure| eprintln!("failed: {}", failure.response.status));
/// assert_eq!(connector.default_api_url.as_deref(), Some("https://api.example.com"));
/// ```
#[derive(Clone, Default)]
pub struct ApiConnector {
    /// Base URL for descriptors without `api`
    pub default_api_url: Option<String>,
    /// Source of bearer tokens for authenticated calls
    pub token_source: Option<Arc<dyn TokenSource>>,
    /// Global failure handler
    pub error_handler: Option<ErrorHandler>,
}

impl ApiConnector {
    /// Empty connector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default base URL
    #[must_use]
    pub fn with_default_api_url(mut self, url: impl Into<String>) -> Self {
        self.default_api_url = Some(url.into());
        self
    }

    /// Set the token source
    #[must_use]
    pub fn with_token_source<T>(mut self, source: T) -> Self
    where
        T: TokenSource + 'static,
    {
        self.token_source = Some(Arc::new(source));
        self
    }

    /// Set the global error handler
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiFailure) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ApiConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConnector")
            .field("default_api_url", &self.default_api_url)
            .field("token_source", &self.token_source.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// A token that never changes
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> BoxFuture<'static, String> {
        let token = self.0.clone();
        Box::pin(async move { token })
    }
}

/// Current value of a `watch` channel
///
/// Lets the application rotate tokens (e.g. after a refresh) without
/// rebuilding the service.
#[derive(Debug, Clone)]
pub struct WatchToken(watch::Receiver<String>);

impl WatchToken {
    /// Read tokens from `rx`
    #[must_use]
    pub const fn new(rx: watch::Receiver<String>) -> Self {
        Self(rx)
    }
}

impl TokenSource for WatchToken {
    fn token(&self) -> BoxFuture<'static, String> {
        let token = self.0.borrow().clone();
        Box::pin(async move { token })
    }
}

/// Stand-in used when no token source is configured
///
/// Yields [`MISSING_TOKEN`] so the request still goes out and the server
/// rejects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingToken;

impl TokenSource for MissingToken {
    fn token(&self) -> BoxFuture<'static, String> {
        tracing::warn!("{}", MISSING_TOKEN);
        Box::pin(async { MISSING_TOKEN.to_string() })
    }
}

/// Routes failures to the global handler unless handled locally
#[derive(Clone)]
pub struct ErrorReporter {
    handler: ErrorHandler,
}

impl ErrorReporter {
    /// Report through `handler`
    #[must_use]
    pub fn new(handler: ErrorHandler) -> Self {
        Self { handler }
    }

    /// Report `failure`, unless its request asked for local handling
    pub fn handle_error(&self, failure: &ApiFailure) -> ErrorHandling {
        if failure.request.local_error_handling {
            tracing::debug!(url = %failure.response.url, "Failure handled locally");
            return ErrorHandling::HandledLocally;
        }
        (self.handler)(failure);
        ErrorHandling::Reported
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(default_error_handler())
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}
