//! Wait-for-any selector.
//!
//! Holds outstanding futures, each tagged by the caller, and yields them in
//! the order they settle rather than the order they were added.

use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

/// Collection of pending futures with an "await first settled" operation.
pub struct Selector<T, O> {
    pending: FuturesUnordered<BoxFuture<'static, (T, O)>>,
}

impl<T, O> Selector<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: FuturesUnordered::new(),
        }
    }

    /// Add a future; `tag` is handed back alongside its output.
    pub fn push<F>(&mut self, tag: T, future: F)
    where
        F: Future<Output = O> + Send + 'static,
    {
        self.pending.push(Box::pin(async move { (tag, future.await) }));
    }

    /// Wait until any outstanding future settles.
    ///
    /// Returns `None` when nothing is outstanding.
    pub async fn next_settled(&mut self) -> Option<(T, O)> {
        self.pending.next().await
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T, O> Default for Selector<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
