//! # api-caller
//!
//! Issue HTTP requests through a centralized, observable store instead of
//! managing each call's state by hand.
//!
//! Every call is described by an [`ApiCallItem`]. Its identity (base URL plus
//! path, or an explicit override) indexes a lifecycle record holding the
//! `loading`/`success`/`error` flags, the last body or error envelope, the
//! response headers and the `fired`/`returned` timestamps. Calls marked
//! `use_cache` reuse the stored body while it is fresh.
//!
//! ## Example
//!
//! ```no_run
//! use api_caller::{ApiCaller, ApiCallItem, ApiConnector, StaticToken};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let caller = ApiCaller::builder()
//!         .connector(
//!             ApiConnector::new()
//!                 .with_default_api_url("https://api.example.com")
//!                 .with_token_source(StaticToken::new("secret")),
//!         )
//!         .build()?;
//!
//!     let profile = ApiCallItem::new("/me")
//!         .with_auth()
//!         .with_cache(Some(Duration::from_secs(30)));
//!
//!     let state = caller.call_api_and_wait(profile, Duration::from_secs(10)).await?;
//!     println!("success: {}, data: {:?}", state.success, state.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Per-request response cache with optional expiry
//! - Observable per-request state (`ApiResults`) with distinct-until-changed selections
//! - Bearer token injection from a pluggable token source
//! - Global error handler with per-call opt-out
//! - JSON, form and multipart bodies; binary responses
//! - `tracing` spans and `metrics` counters throughout

pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod reducer;
pub mod service;
pub mod transport;

// Re-export main types for convenience
pub use api_caller_core::action::ApiAction;
pub use api_caller_core::descriptor::{ApiCallItem, BodyEncoding, HttpMethod, Payload, UploadFile};
pub use api_caller_core::envelope::{
    ApiErrorResponse, ApiFailure, ApiResponse, ErrorHandling, Headers, ResponseBody,
};
pub use api_caller_core::environment::{Clock, HttpTransport, SystemClock, TokenSource};
pub use api_caller_core::selectors::{is_cached, state_id};
pub use api_caller_core::state::{ApiState, ApiSubState};
pub use api_caller_runtime::Selection;
pub use config::ApiCallerConfig;
pub use connector::{ApiConnector, ErrorHandler, MissingToken, StaticToken, WatchToken};
pub use error::ApiCallerError;
pub use executor::RequestExecutor;
pub use reducer::{ApiEnvironment, ApiReducer};
pub use service::{ApiCaller, ApiCallerBuilder, ApiResults, ApiStore};
pub use transport::ReqwestTransport;
