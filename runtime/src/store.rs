//! Reductions, effects and snapshots

use api_caller_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast, watch};

use crate::handle::{self, EffectHandle, Tracker};
use crate::{Selection, StoreConfig, StoreError};

/// Runtime coordinator for one reducer
///
/// Reductions run one at a time behind a write lock and each one publishes a
/// snapshot for [`Selection`]s. Effects run as tokio tasks; an action they
/// produce is reduced and then broadcast to [`subscribe_actions`] receivers.
///
/// Cloning yields another handle to the same store.
///
/// [`subscribe_actions`]: Store::subscribe_actions
pub struct Store<S, A, E, R> {
    inner: Arc<Inner<S, A, E, R>>,
}

struct Inner<S, A, E, R> {
    state: RwLock<S>,
    snapshots: watch::Sender<Arc<S>>,
    actions: broadcast::Sender<A>,
    in_flight: Arc<watch::Sender<usize>>,
    closing: AtomicBool,
    reducer: R,
    environment: E,
    shutdown_timeout: Duration,
}

impl<S, A, E, R> Clone for Store<S, A, E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    E: Send + Sync + 'static,
{
    /// Store with [`StoreConfig::default()`]
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    /// Store with explicit tuning
    #[must_use]
    pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(initial_state.clone()));
        let (actions, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let (in_flight, _) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(initial_state),
                snapshots,
                actions,
                in_flight: Arc::new(in_flight),
                closing: AtomicBool::new(false),
                reducer,
                environment,
                shutdown_timeout: config.default_shutdown_timeout,
            }),
        }
    }

    /// The injected environment
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.inner.environment
    }

    /// Reduce `action` and spawn the effects it returns
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once [`shutdown`](Self::shutdown)
    /// has been called.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.inner.closing.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.commands.total").increment(1);
        let (handle, tracker) = EffectHandle::new();
        self.apply(action, &tracker).await;
        Ok(handle)
    }

    /// Send `action`, then wait for the first fed-back action matching
    /// `predicate`
    ///
    /// The subscription is taken before sending, so a fast effect cannot be
    /// missed. When this returns, the matching action has been reduced.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::Timeout`] if nothing matched within `timeout`
    /// - [`StoreError::ChannelClosed`] if the store went away
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.inner.actions.subscribe();
        self.send(action).await?;

        let matching = async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        };

        tokio::time::timeout(timeout, matching)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Receive every action produced by an effect, after it has been reduced
    ///
    /// Actions passed to [`send`](Self::send) directly are not broadcast.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.inner.actions.subscribe()
    }

    /// Read the state under the lock
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&*self.inner.state.read().await)
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&*self.inner.snapshots.borrow())
    }

    /// Observe a projection of the state
    pub fn select<T, F>(&self, project: F) -> Selection<S, T>
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
        T: Clone + PartialEq,
    {
        Selection::new(self.inner.snapshots.subscribe(), Arc::new(project))
    }

    /// Refuse new actions and wait for running effects to finish
    ///
    /// Effects that are already running still have their output reduced.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
    /// still running when `timeout` elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        metrics::counter!("store.shutdown.initiated").increment(1);
        self.inner.closing.store(true, Ordering::Release);

        let mut in_flight = self.inner.in_flight.subscribe();
        let drained = tokio::time::timeout(timeout, in_flight.wait_for(|running| *running == 0))
            .await
            .is_ok();

        if drained {
            tracing::info!("All effects completed");
            return Ok(());
        }

        let running = *in_flight.borrow();
        tracing::error!(running, "Shutdown timed out");
        metrics::counter!("store.shutdown.timeout").increment(1);
        Err(StoreError::ShutdownTimeout(running))
    }

    /// [`shutdown`](Self::shutdown) with the configured deadline
    ///
    /// # Errors
    ///
    /// See [`shutdown`](Self::shutdown).
    pub async fn close(&self) -> Result<(), StoreError> {
        self.shutdown(self.inner.shutdown_timeout).await
    }

    /// Reduce without the shutdown gate
    ///
    /// Fed-back actions come through here so that effects already running
    /// at shutdown still land in the state.
    async fn apply(&self, action: A, tracker: &Tracker) {
        let effects = {
            let mut state = self.inner.state.write().await;
            let started = Instant::now();
            let effects = self
                .inner
                .reducer
                .reduce(&mut state, action, &self.inner.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            // Published under the lock so snapshots follow reduction order.
            self.inner.snapshots.send_replace(Arc::new(state.clone()));
            effects
        };

        tracing::trace!(effects = effects.len(), "Reduced");
        for effect in effects {
            self.spawn_effect(effect, tracker);
        }
    }

    fn spawn_effect(&self, effect: Effect<A>, tracker: &Tracker) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Future(future) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                let running = (tracker.start(), handle::start(&self.inner.in_flight));
                let tracker = tracker.clone();
                let store = self.clone();

                tokio::spawn(async move {
                    let _running = running;

                    let Some(action) = future.await else {
                        tracing::trace!("Effect finished without an action");
                        return;
                    };

                    store.apply(action.clone(), &tracker).await;
                    if store.inner.actions.send(action).is_err() {
                        tracing::trace!("No action observers");
                    }
                });
            },
        }
    }
}
