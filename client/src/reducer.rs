//! Request lifecycle reducer
//!
//! | Action          | State change                                                   | Effect                                   |
//! |-----------------|----------------------------------------------------------------|------------------------------------------|
//! | `Get`           | `loading`, clears flags, stamps `fired`                        | `GetFromCache` if fresh, else the request |
//! | `GetFromCache`  | `success`                                                      | none                                     |
//! | `GetSuccess`    | `success`, stamps `returned`, stores body and headers          | none                                     |
//! | `GetFail`       | `error`, stamps `returned`, stores error envelope and headers  | failure reporting                        |
//! | `ClearState`    | resets one identity                                            | none                                     |
//! | `ClearAllState` | empties the store                                              | none                                     |

use api_caller_core::action::ApiAction;
use api_caller_core::effect::Effect;
use api_caller_core::envelope::ApiFailure;
use api_caller_core::environment::Clock;
use api_caller_core::reducer::Reducer;
use api_caller_core::selectors::{is_cached, state_id};
use api_caller_core::state::ApiSubState;
use api_caller_core::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;

use crate::connector::ErrorReporter;
use crate::executor::RequestExecutor;

/// Dependencies of [`ApiReducer`]
#[derive(Clone)]
pub struct ApiEnvironment {
    /// Source of `fired`/`returned` stamps and cache age
    pub clock: Arc<dyn Clock>,
    /// Performs requests
    pub executor: RequestExecutor,
    /// Receives failures
    pub reporter: ErrorReporter,
}

impl ApiEnvironment {
    /// Bundle the reducer's dependencies
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, executor: RequestExecutor, reporter: ErrorReporter) -> Self {
        Self {
            clock,
            executor,
            reporter,
        }
    }
}

impl fmt::Debug for ApiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiEnvironment")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Reducer for the request lifecycle
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiReducer;

impl Reducer for ApiReducer {
    type State = ApiSubState;
    type Action = ApiAction;
    type Environment = ApiEnvironment;

    fn reduce(
        &self,
        state: &mut ApiSubState,
        action: ApiAction,
        env: &ApiEnvironment,
    ) -> SmallVec<[Effect<ApiAction>; 4]> {
        tracing::trace!(action = action.action_type(), "Reducing");

        match action {
            ApiAction::Get(request) => {
                let id = state_id(&request);
                let now = env.clock.now();
                state.update(&id, |record| {
                    record.loading = true;
                    record.error = false;
                    record.success = false;
                    record.fired = Some(now);
                });

                if request.use_cache && is_cached(&state.get(&id), request.cache_timeout, now) {
                    tracing::debug!(id = %id, "Serving from cache");
                    metrics::counter!("api_caller.cache.hits").increment(1);
                    return smallvec![Effect::future(async move {
                        Some(ApiAction::GetFromCache(request))
                    })];
                }

                let call = env.executor.make_request(&request);
                smallvec![Effect::future(async move {
                    Some(match call.await {
                        Ok(response) => ApiAction::GetSuccess { request, response },
                        Err(response) => ApiAction::GetFail { request, response },
                    })
                })]
            },

            ApiAction::GetFromCache(request) => {
                state.update(&state_id(&request), |record| {
                    record.loading = false;
                    record.error = false;
                    record.success = true;
                });
                SmallVec::new()
            },

            ApiAction::GetSuccess { request, response } => {
                let now = env.clock.now();
                state.update(&state_id(&request), |record| {
                    record.loading = false;
                    record.error = false;
                    record.success = true;
                    record.returned = Some(now);
                    record.data = Some(response.body);
                    record.headers = response.headers;
                });
                SmallVec::new()
            },

            ApiAction::GetFail { request, response } => {
                let now = env.clock.now();
                state.update(&state_id(&request), |record| {
                    record.loading = false;
                    record.error = true;
                    record.success = false;
                    record.returned = Some(now);
                    record.headers = response.headers.clone();
                    record.error_data = Some(response.clone());
                });

                let reporter = env.reporter.clone();
                let failure = ApiFailure { request, response };
                smallvec![Effect::future(async move {
                    reporter.handle_error(&failure);
                    None
                })]
            },

            ApiAction::ClearState(request) => {
                state.reset(&state_id(&request));
                SmallVec::new()
            },

            ApiAction::ClearAllState => {
                state.clear();
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use crate::connector::{ErrorHandler, MissingToken};
    use api_caller_core::descriptor::ApiCallItem;
    use api_caller_core::envelope::{
        ApiErrorResponse, ApiResponse, ErrorHandling, Headers, ResponseBody,
    };
    use api_caller_core::environment::HttpTransport;
    use api_caller_core::state::ApiState;
    use api_caller_testing::helpers::collect_actions;
    use api_caller_testing::{FixedClock, MockTransport, ReducerTest, assertions, test_clock};
    use chrono::TimeDelta;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn env_with(transport: &MockTransport, clock: FixedClock, handler: ErrorHandler) -> ApiEnvironment {
        let transport: Arc<dyn HttpTransport> = Arc::new(transport.clone());
        ApiEnvironment::new(
            Arc::new(clock),
            RequestExecutor::new(transport, Arc::new(MissingToken), "/"),
            ErrorReporter::new(handler),
        )
    }

    fn test_env(transport: &MockTransport) -> ApiEnvironment {
        env_with(transport, test_clock(), Arc::new(|_: &ApiFailure| {}))
    }

    fn root() -> ApiCallItem {
        ApiCallItem::new("/").with_api("/")
    }

    fn cached_state(age: TimeDelta) -> ApiSubState {
        let mut state = ApiSubState::new();
        state.update("//", |record| {
            record.success = true;
            record.data = Some(ResponseBody::Json(json!({"a": 1})));
            record.returned = Some(test_clock().now() - age);
        });
        state
    }

    #[test]
    fn get_marks_loading_and_keeps_previous_data() {
        let transport = MockTransport::new();
        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(cached_state(TimeDelta::seconds(5)))
            .when_action(ApiAction::Get(root()))
            .then_state(|state| {
                let record = state.get("//");
                assert!(record.loading);
                assert!(!record.success);
                assert!(!record.error);
                assert_eq!(record.fired, Some(test_clock().now()));
                assert_eq!(record.data, Some(ResponseBody::Json(json!({"a": 1}))));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn get_on_empty_store_matches_initial_shape() {
        let transport = MockTransport::new();
        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(ApiSubState::new())
            .when_action(ApiAction::Get(root()))
            .then_state(|state| {
                assert_eq!(
                    *state.get("//"),
                    ApiState {
                        loading: true,
                        fired: Some(test_clock().now()),
                        ..ApiState::default()
                    }
                );
            })
            .run();
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits() {
        let transport = MockTransport::new();
        let effects = ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(cached_state(TimeDelta::milliseconds(500)))
            .when_action(ApiAction::Get(root().with_cache(Some(Duration::from_millis(1000)))))
            .run_with_effects();

        let actions = collect_actions(effects).await;
        assert!(matches!(actions.as_slice(), [ApiAction::GetFromCache(_)]));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn stale_cache_calls_network() {
        let transport = MockTransport::new();
        transport.push_ok(ApiResponse::json(json!({"fresh": true})));

        let effects = ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(cached_state(TimeDelta::milliseconds(2000)))
            .when_action(ApiAction::Get(root().with_cache(Some(Duration::from_millis(1000)))))
            .run_with_effects();

        let actions = collect_actions(effects).await;
        assert!(matches!(actions.as_slice(), [ApiAction::GetSuccess { .. }]));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn cache_disabled_always_calls_network() {
        let transport = MockTransport::new();
        let effects = ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(cached_state(TimeDelta::milliseconds(1)))
            .when_action(ApiAction::Get(root()))
            .run_with_effects();

        let _ = collect_actions(effects).await;
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_becomes_get_fail() {
        let transport = MockTransport::new();
        transport.push_err(ApiErrorResponse::http(
            404,
            "//",
            Headers::new(),
            ResponseBody::Empty,
        ));

        let effects = ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(ApiSubState::new())
            .when_action(ApiAction::Get(root()))
            .run_with_effects();

        let actions = collect_actions(effects).await;
        match actions.as_slice() {
            [ApiAction::GetFail { response, .. }] => assert_eq!(response.status, 404),
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn success_stores_body_and_headers() {
        let transport = MockTransport::new();
        let mut headers = Headers::new();
        headers.insert("etag".into(), "\"v1\"".into());
        let response = ApiResponse {
            status: 200,
            headers: headers.clone(),
            body: ResponseBody::Json(json!([1, 2])),
        };

        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(ApiSubState::new())
            .when_action(ApiAction::GetSuccess {
                request: root(),
                response,
            })
            .then_state(move |state| {
                let record = state.get("//");
                assert!(record.success);
                assert!(!record.loading);
                assert_eq!(record.returned, Some(test_clock().now()));
                assert_eq!(record.data, Some(ResponseBody::Json(json!([1, 2]))));
                assert_eq!(record.headers, headers);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn failure_is_stored_and_reported() {
        let transport = MockTransport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let env = env_with(
            &transport,
            test_clock(),
            Arc::new(move |failure: &ApiFailure| {
                sink.lock().unwrap().push(failure.response.status);
            }),
        );
        let response = ApiErrorResponse::http(500, "//", Headers::new(), ResponseBody::Empty);

        let effects = ReducerTest::new(ApiReducer)
            .with_env(env)
            .given_state(ApiSubState::new())
            .when_action(ApiAction::GetFail {
                request: root(),
                response: response.clone(),
            })
            .then_state(move |state| {
                let record = state.get("//");
                assert!(record.error);
                assert!(!record.success);
                assert_eq!(record.error_data, Some(response));
                assert_eq!(record.returned, Some(test_clock().now()));
            })
            .run_with_effects();

        let actions = collect_actions(effects).await;
        assert!(actions.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![500]);
    }

    #[tokio::test]
    async fn local_failures_skip_the_handler() {
        let transport = MockTransport::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let env = env_with(
            &transport,
            test_clock(),
            Arc::new(move |_: &ApiFailure| *sink.lock().unwrap() += 1),
        );
        let failure = ApiFailure {
            request: root().with_local_error_handling(),
            response: ApiErrorResponse::network("//", "offline"),
        };
        assert_eq!(env.reporter.handle_error(&failure), ErrorHandling::HandledLocally);

        let effects = ReducerTest::new(ApiReducer)
            .with_env(env)
            .given_state(ApiSubState::new())
            .when_action(ApiAction::GetFail {
                request: failure.request,
                response: failure.response,
            })
            .run_with_effects();
        let _ = collect_actions(effects).await;

        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn from_cache_only_touches_flags() {
        let transport = MockTransport::new();
        let mut given = cached_state(TimeDelta::seconds(1));
        given.update("//", |record| record.loading = true);
        let before = given.get("//");

        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(given)
            .when_action(ApiAction::GetFromCache(root()))
            .then_state(move |state| {
                let record = state.get("//");
                assert!(record.success);
                assert!(!record.loading);
                assert_eq!(record.data, before.data);
                assert_eq!(record.returned, before.returned);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn clear_state_resets_one_identity() {
        let transport = MockTransport::new();
        let mut given = cached_state(TimeDelta::seconds(1));
        given.update("/other", |record| record.success = true);

        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(given)
            .when_action(ApiAction::ClearState(root()))
            .then_state(|state| {
                assert_eq!(*state.get("//"), ApiState::default());
                assert!(state.get("/other").success);
            })
            .run();
    }

    #[test]
    fn clear_all_state_empties_store() {
        let transport = MockTransport::new();
        ReducerTest::new(ApiReducer)
            .with_env(test_env(&transport))
            .given_state(cached_state(TimeDelta::seconds(1)))
            .when_action(ApiAction::ClearAllState)
            .then_state(|state| assert!(state.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
