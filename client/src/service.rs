//! Public entry point
//!
//! [`ApiCaller`] owns the store, fills descriptor defaults and exposes the
//! lifecycle of each request as [`ApiResults`].

use api_caller_core::action::ApiAction;
use api_caller_core::descriptor::ApiCallItem;
use api_caller_core::envelope::{
    ApiErrorResponse, ApiFailure, ApiResponse, ErrorHandling, Headers, ResponseBody,
};
use api_caller_core::environment::{Clock, HttpTransport, SystemClock, TokenSource};
use api_caller_core::selectors::{ApiSelectors, state_id};
use api_caller_core::state::{ApiState, ApiSubState};
use api_caller_runtime::{Selection, Store, StoreConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiCallerConfig;
use crate::connector::{ApiConnector, ErrorReporter, MissingToken, default_error_handler};
use crate::error::ApiCallerError;
use crate::executor::RequestExecutor;
use crate::reducer::{ApiEnvironment, ApiReducer};
use crate::transport::ReqwestTransport;

/// The store type driven by [`ApiCaller`]
pub type ApiStore = Store<ApiSubState, ApiAction, ApiEnvironment, ApiReducer>;

/// Observable views of one request's record
///
/// Every field is a [`Selection`]: `current()` reads the present value, and
/// `next().await` waits for the next distinct one.
#[derive(Debug, Clone)]
pub struct ApiResults {
    /// Identity the views are bound to
    pub id: String,
    /// Request in flight
    pub loading: Selection<ApiSubState, bool>,
    /// Last completion succeeded
    pub success: Selection<ApiSubState, bool>,
    /// Last completion failed
    pub error: Selection<ApiSubState, bool>,
    /// `success || error`
    pub finished: Selection<ApiSubState, bool>,
    /// Last successful body
    pub data: Selection<ApiSubState, Option<ResponseBody>>,
    /// Last error envelope
    pub error_data: Selection<ApiSubState, Option<ApiErrorResponse>>,
    /// Headers of the last response
    pub headers: Selection<ApiSubState, Headers>,
}

/// Builder for [`ApiCaller`]
#[derive(Default)]
pub struct ApiCallerBuilder {
    config: Option<ApiCallerConfig>,
    connector: Option<ApiConnector>,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ApiCallerBuilder {
    /// Use `config` instead of [`ApiCallerConfig::default()`]
    #[must_use]
    pub fn config(mut self, config: ApiCallerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Supply application collaborators
    #[must_use]
    pub fn connector(mut self, connector: ApiConnector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the `reqwest` transport
    #[must_use]
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: HttpTransport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the system clock
    #[must_use]
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the service
    ///
    /// Connector values take precedence over the configuration. Without a
    /// connector a warning is logged and defaults are used.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::ClientBuild`] if no transport was given and
    /// the default one cannot be created.
    pub fn build(self) -> Result<ApiCaller, ApiCallerError> {
        let config = self.config.unwrap_or_default();

        let connector = self.connector.unwrap_or_else(|| {
            tracing::warn!("apiConnector not provided, using defaults");
            ApiConnector::default()
        });

        let default_api_url = connector
            .default_api_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| config.default_api_url.clone());
        let token_source: Arc<dyn TokenSource> =
            connector.token_source.unwrap_or_else(|| Arc::new(MissingToken));
        let handler = connector.error_handler.unwrap_or_else(default_error_handler);

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let environment = ApiEnvironment::new(
            clock,
            RequestExecutor::new(transport, token_source, default_api_url),
            ErrorReporter::new(handler),
        );
        let store_config = StoreConfig::default()
            .with_broadcast_capacity(config.broadcast_capacity)
            .with_shutdown_timeout(config.shutdown_timeout);

        tracing::debug!(
            default_api_url = environment.executor.default_api_url(),
            "ApiCaller ready"
        );

        Ok(ApiCaller {
            store: Store::with_config(ApiSubState::new(), ApiReducer, environment, store_config),
        })
    }
}

/// Issues HTTP requests through the store and exposes their lifecycle
///
/// Cloning yields another handle to the same store.
///
/// # Example
///
/// ```no_run
/// use api_caller::{ApiCaller, ApiCallItem, ApiConnector};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), api_caller::ApiCallerError> {
/// let caller = ApiCaller::builder()
///     .connector(ApiConnector::new().with_default_api_url("https://api.example.com"))
///     .build()?;
///
/// let users = ApiCallItem::new("/users").with_cache(Some(Duration::from_secs(60)));
/// let mut results = caller.call_api(users).await?;
/// results.finished.wait_for(|done| *done).await;
/// println!("{:?}", results.data.current());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiCaller {
    store: ApiStore,
}

impl ApiCaller {
    /// Start building a service
    #[must_use]
    pub fn builder() -> ApiCallerBuilder {
        ApiCallerBuilder::default()
    }

    /// Service with the default transport, clock and configuration
    ///
    /// # Errors
    ///
    /// See [`ApiCallerBuilder::build`].
    pub fn new(connector: Option<ApiConnector>) -> Result<Self, ApiCallerError> {
        let builder = Self::builder();
        match connector {
            Some(connector) => builder.connector(connector),
            None => builder,
        }
        .build()
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &ApiStore {
        &self.store
    }

    /// Start the call described by `item` and return views of its record
    ///
    /// The views are created before the call is dispatched. Selections hold
    /// the latest value only, so use [`Selection::wait_for`] rather than
    /// counting intermediate transitions.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::Store`] if the store is shutting down.
    pub async fn call_api(&self, item: ApiCallItem) -> Result<ApiResults, ApiCallerError> {
        let item = self.prepare(item);
        let results = self.create_api_results(&item);
        self.store.send(ApiAction::Get(item)).await?;
        Ok(results)
    }

    /// Start the call described by `item` and wait until it completes
    ///
    /// Completion is a success, a failure or a cache hit for the same
    /// identity. Returns the record as it was right after completion.
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::Store`] on timeout or if the store is
    /// shutting down.
    pub async fn call_api_and_wait(
        &self,
        item: ApiCallItem,
        timeout: Duration,
    ) -> Result<Arc<ApiState>, ApiCallerError> {
        let item = self.prepare(item);
        let id = state_id(&item);

        self.store
            .send_and_wait_for(
                ApiAction::Get(item),
                |action| action.is_terminal() && action.request().is_some_and(|r| state_id(r) == id),
                timeout,
            )
            .await?;

        Ok(self.store.snapshot().get(&id))
    }

    /// Reset the record of `item` to its default
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::Store`] if the store is shutting down.
    pub async fn reset_api(&self, item: ApiCallItem) -> Result<(), ApiCallerError> {
        let item = self.prepare(item);
        self.store.send(ApiAction::ClearState(item)).await?;
        Ok(())
    }

    /// Drop every record
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::Store`] if the store is shutting down.
    pub async fn reset_all_api(&self) -> Result<(), ApiCallerError> {
        self.store.send(ApiAction::ClearAllState).await?;
        Ok(())
    }

    /// Views of the record for `item`, without dispatching anything
    #[must_use]
    pub fn create_api_results(&self, item: &ApiCallItem) -> ApiResults {
        let id = state_id(&self.prepare(item.clone()));

        macro_rules! view {
            ($selector:path) => {{
                let id = id.clone();
                self.store.select(move |state: &ApiSubState| $selector(state, &id))
            }};
        }

        ApiResults {
            loading: view!(ApiSelectors::is_loading),
            success: view!(ApiSelectors::is_succeeded),
            error: view!(ApiSelectors::is_failed),
            finished: view!(ApiSelectors::is_finished),
            data: view!(ApiSelectors::get_response),
            error_data: view!(ApiSelectors::get_error_data),
            headers: view!(ApiSelectors::get_headers),
            id,
        }
    }

    /// Current record for `item`
    #[must_use]
    pub fn state(&self, item: &ApiCallItem) -> Arc<ApiState> {
        let id = state_id(&self.prepare(item.clone()));
        self.store.snapshot().get(&id)
    }

    /// Perform the call described by `item` without touching the store
    pub fn make_request(
        &self,
        item: &ApiCallItem,
    ) -> impl Future<Output = Result<ApiResponse, ApiErrorResponse>> + Send + 'static {
        let item = self.prepare(item.clone());
        self.store.environment().executor.make_request(&item)
    }

    /// Route `failure` to the global handler unless handled locally
    pub fn handle_error(&self, failure: &ApiFailure) -> ErrorHandling {
        self.store.environment().reporter.handle_error(failure)
    }

    /// Stop accepting calls and wait for in-flight ones
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::Store`] if requests are still running when
    /// the configured shutdown timeout elapses.
    pub async fn shutdown(&self) -> Result<(), ApiCallerError> {
        self.store.close().await?;
        Ok(())
    }

    /// Fill the default base URL and drop empty upload payloads
    fn prepare(&self, mut item: ApiCallItem) -> ApiCallItem {
        if item.api.as_deref().is_none_or(str::is_empty) {
            item.api = Some(self.store.environment().executor.default_api_url().to_string());
        }
        if item.binary_upload.is_some() && !item.has_payload() {
            item.payload = None;
        }
        item
    }
}

impl std::fmt::Debug for ApiCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCaller")
            .field("environment", self.store.environment())
            .finish_non_exhaustive()
    }
}
