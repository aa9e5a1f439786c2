//! Prometheus metrics for api-caller
//!
//! Metric names emitted by the workspace:
//! - `api_caller.requests.total{method}`: requests sent over the transport
//! - `api_caller.responses{outcome}`: completed requests, `success` or `failure`
//! - `api_caller.cache.hits`: calls served from cache
//! - `store.commands.total`, `store.effects.executed{type}`,
//!   `store.reducer.duration_seconds`: store runtime
//!
//! Metrics go nowhere until a recorder is installed. [`MetricsRecorder`]
//! installs a Prometheus one.
//!
//! # Example
//!
//! ```rust,no_run
//! use api_caller::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), api_caller::metrics::MetricsError> {
//! let recorder = MetricsRecorder::install()?;
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::fmt;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsRecorder {
    /// Describe all metrics and install the Prometheus recorder globally.
    ///
    /// If another recorder is already installed this succeeds with a warning,
    /// and [`render`](Self::render) returns `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or installed.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                describe_metrics();
                tracing::info!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register descriptions for every metric the workspace emits.
pub fn describe_metrics() {
    describe_counter!(
        "api_caller.requests.total",
        "Total number of HTTP requests sent"
    );
    describe_counter!(
        "api_caller.responses",
        "Completed HTTP requests by outcome"
    );
    describe_counter!(
        "api_caller.cache.hits",
        "Calls answered from cached data"
    );
    describe_counter!(
        "store.commands.total",
        "Total number of actions reduced by the store"
    );
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed by type"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to execute the reducer"
    );
}
