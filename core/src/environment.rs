//! Environment module - Dependency injection traits
//!
//! All external dependencies are abstracted behind traits and injected
//! via the Environment parameter. Production implementations live in the
//! `api-caller` crate, deterministic ones in `api-caller-testing`.

use crate::envelope::{ApiErrorResponse, ApiResponse};
use crate::transport::TransportRequest;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

/// Clock trait - abstracts time operations for testability
///
/// Request timestamps (`fired`, `returned`) and cache freshness are both
/// computed from the environment's clock.
///
/// # Examples
///
/// ```ignore
/// // Test - fixed time for deterministic tests
/// struct FixedClock { time: DateTime<Utc> }
/// impl Clock for FixedClock {
///     fn now(&self) -> DateTime<Utc> {
///         self.time
///     }
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Performs HTTP requests
///
/// Implementations must not panic and must not return early with a raised
/// fault: every outcome, including connection errors, is reported as one of
/// the two envelopes.
pub trait HttpTransport: Send + Sync {
    /// Send `request` and resolve with its outcome
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Result<ApiResponse, ApiErrorResponse>>;
}

/// Supplies bearer tokens for authenticated calls
///
/// The executor takes exactly one token per request.
pub trait TokenSource: Send + Sync {
    /// The current token
    fn token(&self) -> BoxFuture<'static, String>;
}
