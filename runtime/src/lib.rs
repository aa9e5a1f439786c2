//! # api-caller runtime
//!
//! The [`Store`] that drives `api-caller`'s request lifecycle: it serializes
//! reductions, runs the effects reducers return, feeds their outputs back in
//! and publishes an immutable snapshot after every reduction.
//!
//! - [`Store::send`] reduces one action and spawns its effects
//! - [`Store::send_and_wait_for`] also waits for a matching fed-back action
//! - [`Store::select`] returns a [`Selection`] over snapshots
//! - [`Store::shutdown`] stops intake and drains in-flight effects
//!
//! ## Example
//!
//! ```ignore
//! use api_caller_runtime::Store;
//!
//! let store = Store::new(ApiSubState::new(), ApiReducer, environment);
//!
//! store.send(ApiAction::Get(item)).await?;
//!
//! let mut loading = store.select(move |s| ApiSelectors::is_loading(s, &id));
//! while let Some(value) = loading.next().await { /* ... */ }
//! ```

use std::time::Duration;
use thiserror::Error;

mod handle;
pub mod selection;
mod store;

pub use handle::EffectHandle;
pub use selection::Selection;
pub use store::Store;

/// Errors returned by [`Store`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `shutdown` was called; new actions are refused
    #[error("Store is shutting down")]
    ShutdownInProgress,

    /// Effects were still running when the shutdown deadline passed
    #[error("Shutdown timed out with {0} effects still running")]
    ShutdownTimeout(usize),

    /// No matching action arrived in time
    #[error("Timeout waiting for action")]
    Timeout,

    /// Every store handle was dropped while waiting
    #[error("Action broadcast channel closed")]
    ChannelClosed,
}

/// Tuning for a [`Store`]
///
/// ```
/// use api_caller_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Fed-back actions buffered per observer before it lags
    pub broadcast_capacity: usize,
    /// Deadline used by [`Store::close`]
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the deadline used by [`Store::close`]
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}
