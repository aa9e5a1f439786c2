//! Integration tests for Store action broadcasting and state selections
//!
//! Uses a small request/response reducer: `Fetch` starts an async lookup that
//! answers with `Fetched` or `Failed`, correlated by id.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use api_caller_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use api_caller_runtime::{Store, StoreConfig, StoreError};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum LookupAction {
    /// Start a lookup
    Fetch { id: u64, delay_ms: u64 },
    /// Lookup answered (terminal)
    Fetched { id: u64, value: String },
    /// Lookup failed (terminal)
    Failed { id: u64 },
    /// Look up again, starting from a fed-back action
    Refresh { id: u64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LookupState {
    pending: Vec<u64>,
    values: BTreeMap<u64, String>,
}

#[derive(Clone)]
struct LookupEnvironment;

#[derive(Clone)]
struct LookupReducer;

impl Reducer for LookupReducer {
    type State = LookupState;
    type Action = LookupAction;
    type Environment = LookupEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LookupAction::Fetch { id, delay_ms } => {
                state.pending.push(id);
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if id == 0 {
                        Some(LookupAction::Failed { id })
                    } else {
                        Some(LookupAction::Fetched {
                            id,
                            value: format!("value-{id}"),
                        })
                    }
                })]
            },
            LookupAction::Fetched { id, value } => {
                state.pending.retain(|p| *p != id);
                state.values.insert(id, value);
                SmallVec::new()
            },
            LookupAction::Failed { id } => {
                state.pending.retain(|p| *p != id);
                SmallVec::new()
            },
            LookupAction::Refresh { id } => smallvec![Effect::future(async move {
                Some(LookupAction::Fetch { id, delay_ms: 0 })
            })],
        }
    }
}

fn store() -> Store<LookupState, LookupAction, LookupEnvironment, LookupReducer> {
    Store::new(LookupState::default(), LookupReducer, LookupEnvironment)
}

fn fetched(id: u64) -> impl Fn(&LookupAction) -> bool {
    move |action| matches!(action, LookupAction::Fetched { id: got, .. } if *got == id)
}

// ============================================================================
// Tests
// ============================================================================

/// `send_and_wait_for` returns the terminal action of a request
#[tokio::test]
async fn test_send_and_wait_for_terminal_action() {
    let store = store();

    let result = store
        .send_and_wait_for(
            LookupAction::Fetch { id: 7, delay_ms: 5 },
            fetched(7),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        LookupAction::Fetched {
            id: 7,
            value: "value-7".into()
        }
    );
}

/// The state read after a matching action already reflects that action
#[tokio::test]
async fn test_observed_action_is_already_reduced() {
    let store = store();

    store
        .send_and_wait_for(
            LookupAction::Fetch { id: 3, delay_ms: 0 },
            fetched(3),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.values.get(&3).map(String::as_str), Some("value-3"));
    assert!(snapshot.pending.is_empty());
}

/// Failures are broadcast like any other action
#[tokio::test]
async fn test_failure_broadcasting() {
    let store = store();

    let result = store
        .send_and_wait_for(
            LookupAction::Fetch { id: 0, delay_ms: 0 },
            |action| matches!(action, LookupAction::Failed { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), LookupAction::Failed { id: 0 });
}

/// Waiting gives up after the timeout
#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = store();

    let result = store
        .send_and_wait_for(
            LookupAction::Fetch {
                id: 1,
                delay_ms: 1_000,
            },
            fetched(1),
            Duration::from_millis(20),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

/// Concurrent waiters each receive their own response
#[tokio::test]
async fn test_correlation_filtering() {
    let store = store();
    let mut handles = vec![];

    for id in 1..=5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    LookupAction::Fetch {
                        id,
                        delay_ms: 30 - id * 5,
                    },
                    fetched(id),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (idx, handle) in handles.into_iter().enumerate() {
        let id = idx as u64 + 1;
        let action = handle.await.expect("Task panicked").unwrap();
        assert!(fetched(id)(&action), "request {id} got {action:?}");
    }

    assert_eq!(store.snapshot().values.len(), 5);
}

/// Actions sent directly are not broadcast, effect outputs are
#[tokio::test]
async fn test_initial_actions_not_broadcast() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let mut handle = store
        .send(LookupAction::Fetch { id: 2, delay_ms: 0 })
        .await
        .unwrap();
    handle.wait().await;

    let actions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        actions,
        vec![LookupAction::Fetched {
            id: 2,
            value: "value-2".into()
        }]
    );
}

/// Actions fed back by a chain of effects are broadcast in order
#[tokio::test]
async fn test_chained_effect_broadcasting() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(LookupAction::Refresh { id: 4 }).await.unwrap();
    handle.wait().await;

    assert_eq!(
        rx.recv().await.unwrap(),
        LookupAction::Fetch { id: 4, delay_ms: 0 }
    );
    assert!(fetched(4)(&rx.recv().await.unwrap()));
}

/// Independent subscribers all see every effect output
#[tokio::test]
async fn test_multiple_independent_subscribers() {
    let store = store();
    let mut receivers: Vec<_> = (0..3).map(|_| store.subscribe_actions()).collect();

    for id in 1..=2 {
        let mut handle = store
            .send(LookupAction::Fetch { id, delay_ms: 0 })
            .await
            .unwrap();
        handle.wait().await;
    }

    for rx in &mut receivers {
        assert_eq!(std::iter::from_fn(|| rx.try_recv().ok()).count(), 2);
    }
}

/// A slow subscriber lags instead of blocking the store
#[tokio::test]
async fn test_lagging_subscriber() {
    let store = Store::with_config(
        LookupState::default(),
        LookupReducer,
        LookupEnvironment,
        StoreConfig::default().with_broadcast_capacity(2),
    );
    let mut rx = store.subscribe_actions();

    for id in 1..=10 {
        let mut handle = store
            .send(LookupAction::Fetch { id, delay_ms: 0 })
            .await
            .unwrap();
        handle.wait().await;
    }

    let mut lagged = false;
    let mut received = 0;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
            Err(_) => break,
        }
    }

    assert!(lagged, "Expected subscriber to lag");
    assert_eq!(received, 2);
    assert_eq!(store.snapshot().values.len(), 10);
}

/// Subscribers see the channel close once every store handle is gone
#[tokio::test]
async fn test_channel_closed_on_store_drop() {
    let store = store();
    let mut rx = store.subscribe_actions();

    drop(store);

    assert!(matches!(
        rx.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Closed)
    ));
}

/// Selections only wake for changes to their projection
#[tokio::test]
async fn test_selection_follows_projection() {
    let store = store();
    let mut value = store.select(|s: &LookupState| s.values.get(&9).cloned());
    let mut pending = store.select(|s: &LookupState| s.pending.len());

    assert_eq!(value.current(), None);

    store
        .send(LookupAction::Fetch { id: 9, delay_ms: 10 })
        .await
        .unwrap();
    assert_eq!(pending.next().await, Some(1));

    assert_eq!(value.next().await, Some(Some("value-9".into())));
    assert_eq!(pending.current(), 0);
}

/// Selections end when the store is dropped
#[tokio::test]
async fn test_selection_ends_with_store() {
    let store = store();
    let mut pending = store.select(|s: &LookupState| s.pending.len());

    drop(store);

    assert_eq!(pending.next().await, None);
}
