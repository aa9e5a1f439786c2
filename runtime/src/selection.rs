//! Derived views over store snapshots
//!
//! A [`Selection`] is subscribed to the snapshot channel of a
//! [`Store`](crate::Store). It always has a current value, and
//! [`next`](Selection::next) resolves only when a reduction actually changes
//! the projected value.

use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;

type Projection<S, T> = Arc<dyn Fn(&S) -> T + Send + Sync>;

/// A projection of the store's state
pub struct Selection<S, T> {
    rx: watch::Receiver<Arc<S>>,
    project: Projection<S, T>,
    last: T,
}

impl<S, T> Selection<S, T>
where
    T: Clone + PartialEq,
{
    pub(crate) fn new(mut rx: watch::Receiver<Arc<S>>, project: Projection<S, T>) -> Self {
        let last = project(&rx.borrow_and_update());
        Self { rx, project, last }
    }

    /// Value of the projection for the latest snapshot
    #[must_use]
    pub fn current(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Wait for the projected value to change
    ///
    /// Returns `None` once every handle to the store has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let value = (self.project)(&self.rx.borrow_and_update());
            if value != self.last {
                self.last = value.clone();
                return Some(value);
            }
        }
    }

    /// Wait until the projection satisfies `predicate`, checking the current
    /// value first
    ///
    /// Returns `None` if the store goes away before that happens.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let current = self.current();
        if predicate(&current) {
            self.last = current.clone();
            return Some(current);
        }
        while let Some(value) = self.next().await {
            if predicate(&value) {
                return Some(value);
            }
        }
        None
    }

    /// Stream of the current value followed by every distinct change
    pub fn into_stream(mut self) -> impl Stream<Item = T> + Send
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        async_stream::stream! {
            let current = self.current();
            self.last = current.clone();
            yield current;
            while let Some(value) = self.next().await {
                yield value;
            }
        }
    }
}

impl<S, T: Clone> Clone for Selection<S, T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            project: Arc::clone(&self.project),
            last: self.last.clone(),
        }
    }
}

impl<S, T: std::fmt::Debug> std::fmt::Debug for Selection<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
