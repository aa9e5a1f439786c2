//! Completion tracking for the effects of one `send`

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::StoreError;

/// Resolves once every effect spawned for one [`Store::send`](crate::Store::send)
/// has finished
///
/// An effect that feeds an action back counts as running until that action
/// and the effects it returns are done too.
///
/// ```ignore
/// let mut handle = store.send(ApiAction::Get(item)).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The response has been reduced
/// ```
#[derive(Debug, Clone)]
pub struct EffectHandle {
    running: watch::Receiver<usize>,
}

impl EffectHandle {
    pub(crate) fn new() -> (Self, Tracker) {
        let (tx, running) = watch::channel(0);
        (Self { running }, Tracker(Arc::new(tx)))
    }

    /// Number of effects still running
    #[must_use]
    pub fn running(&self) -> usize {
        *self.running.borrow()
    }

    /// Wait until no effect is running
    pub async fn wait(&mut self) {
        // A closed channel means every tracker is gone, so nothing is running.
        let _ = self.running.wait_for(|running| *running == 0).await;
    }

    /// [`wait`](Self::wait) with a deadline
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when
    /// `timeout` elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

/// Counter shared by the effects of one `send`
#[derive(Clone)]
pub(crate) struct Tracker(Arc<watch::Sender<usize>>);

impl Tracker {
    /// Count one effect as running until the guard drops
    pub(crate) fn start(&self) -> Running {
        start(&self.0)
    }
}

/// Count one effect against `counter` until the guard drops
pub(crate) fn start(counter: &Arc<watch::Sender<usize>>) -> Running {
    counter.send_modify(|running| *running += 1);
    Running(Arc::clone(counter))
}

/// Decrements its counter on drop, including when the effect panics
pub(crate) struct Running(Arc<watch::Sender<usize>>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.send_modify(|running| *running = running.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_without_effects_is_complete() {
        let (mut handle, _tracker) = EffectHandle::new();
        assert_eq!(handle.running(), 0);
        handle.wait().await;
    }

    #[tokio::test]
    async fn handle_waits_for_every_guard() {
        let (mut handle, tracker) = EffectHandle::new();
        let first = tracker.start();
        let second = tracker.start();
        assert_eq!(handle.running(), 2);

        drop(first);
        assert!(matches!(
            handle.wait_with_timeout(Duration::from_millis(10)).await,
            Err(StoreError::Timeout)
        ));

        drop(second);
        assert!(handle.wait_with_timeout(Duration::from_millis(10)).await.is_ok());
        assert_eq!(handle.running(), 0);
    }
}
