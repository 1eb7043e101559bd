//! Concurrency budget.
//!
//! A counting permit pool with non-blocking acquire. Permits release on drop,
//! so every acquired permit is returned exactly once, on every path.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::normalize_max_concurrent;

/// Permit pool sized to the maximum number of concurrent dispatches.
#[derive(Debug, Clone)]
pub struct ConcurrencyBudget {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of concurrency. Returned to the budget when dropped.
#[derive(Debug)]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

impl ConcurrencyBudget {
    /// Create a budget; `max_concurrent <= 0` selects the default capacity.
    pub fn new(max_concurrent: i64) -> Self {
        let capacity = normalize_max_concurrent(max_concurrent);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|inner| Permit { _inner: inner })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn outstanding(&self) -> usize {
        self.capacity - self.available()
    }
}
