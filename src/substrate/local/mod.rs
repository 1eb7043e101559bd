//! In-process substrate.
//!
//! Keeps a registry of idempotency keys and runs each dispatched unit on its
//! own tokio task, under the configured retry policy. Registry entries outlive
//! the batch that created them, so a resubmitted batch sees the same keys.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use backon::Retryable;
use tokio::runtime::Handle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{DispatchFuture, ReusePolicy, Result, Substrate, SubstrateError};
use crate::unit::{ExecutorError, IdempotencyKey, UnitExecutor, UnitInput, UnitResult};
use crate::utils::retry::RetryPolicy;

/// Lifecycle of one idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyStatus {
    Running,
    Completed(UnitResult),
    Failed(String),
}

#[derive(Debug)]
struct KeyRecord {
    status: KeyStatus,
    executions: u32,
}

type Registry = Arc<Mutex<HashMap<IdempotencyKey, KeyRecord>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<IdempotencyKey, KeyRecord>> {
    // Entries are only ever replaced whole, so a poisoned map is still consistent.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn settle(registry: &Registry, key: &IdempotencyKey, status: KeyStatus) {
    if let Some(record) = lock(registry).get_mut(key) {
        record.status = status;
    }
}

/// Substrate that executes units in-process.
///
/// The key registry is never pruned. Under `ReusePolicy::RejectDuplicate` a
/// key must be remembered for the substrate's lifetime to keep rejecting it,
/// so memory grows with the number of distinct keys ever dispatched.
pub struct LocalSubstrate {
    executor: Arc<dyn UnitExecutor>,
    retry: RetryPolicy,
    reuse_policy: ReusePolicy,
    registry: Registry,
    closed: AtomicBool,
}

impl LocalSubstrate {
    pub fn new(executor: Arc<dyn UnitExecutor>, retry: RetryPolicy) -> Self {
        Self {
            executor,
            retry,
            reuse_policy: ReusePolicy::default(),
            registry: Arc::new(Mutex::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_reuse_policy(mut self, reuse_policy: ReusePolicy) -> Self {
        self.reuse_policy = reuse_policy;
        self
    }

    /// Current status of `key`, if it was ever dispatched.
    pub fn status(&self, key: &IdempotencyKey) -> Option<KeyStatus> {
        lock(&self.registry).get(key).map(|r| r.status.clone())
    }

    /// Number of executions started for `key`.
    pub fn execution_count(&self, key: &IdempotencyKey) -> u32 {
        lock(&self.registry).get(key).map_or(0, |r| r.executions)
    }

    /// Stop accepting dispatches. In-flight executions run to completion.
    pub fn close(&self) {
        info!("Closing local substrate");
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Claim `key` for a new execution, or report why it cannot run.
    fn claim(&self, key: &IdempotencyKey) -> Result<()> {
        let mut registry = lock(&self.registry);
        if let Some(record) = registry.get_mut(key) {
            let reusable = match record.status {
                KeyStatus::Running => false,
                _ => self.reuse_policy == ReusePolicy::AllowDuplicate,
            };
            if !reusable {
                return Err(SubstrateError::AlreadyStarted { key: key.clone() });
            }
            record.status = KeyStatus::Running;
            record.executions += 1;
        } else {
            registry.insert(
                key.clone(),
                KeyRecord {
                    status: KeyStatus::Running,
                    executions: 1,
                },
            );
        }
        Ok(())
    }
}

impl Substrate for LocalSubstrate {
    fn dispatch(&self, key: IdempotencyKey, input: UnitInput) -> Result<DispatchFuture> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SubstrateError::Unavailable(
                "substrate is closed".to_string(),
            ));
        }
        if input.order_ref.is_empty() {
            return Err(SubstrateError::InvalidInput(
                "order_ref must not be empty".to_string(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| SubstrateError::Unavailable(format!("no async runtime: {e}")))?;

        self.claim(&key)?;
        debug!(%key, executor = self.executor.name(), "Unit dispatched");

        let executor = Arc::clone(&self.executor);
        let retry = self.retry.clone();
        let registry = Arc::clone(&self.registry);
        let task_key = key.clone();
        let span = info_span!("unit.execute", key = %key, order_ref = %input.order_ref);

        let handle = runtime.spawn(
            async move {
                let outcome = execute_with_policy(executor.as_ref(), &input, &task_key, &retry).await;
                match outcome {
                    Ok(result) => {
                        settle(&registry, &task_key, KeyStatus::Completed(result.clone()));
                        Ok(result)
                    }
                    Err(source) => {
                        settle(&registry, &task_key, KeyStatus::Failed(source.to_string()));
                        Err(SubstrateError::Execution {
                            key: task_key,
                            source,
                        })
                    }
                }
            }
            .instrument(span),
        );

        let registry = Arc::clone(&self.registry);
        Ok(Box::pin(async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let reason = join_error.to_string();
                    settle(&registry, &key, KeyStatus::Failed(reason.clone()));
                    Err(SubstrateError::Cancelled { key, reason })
                }
            }
        }))
    }
}

/// Run one unit under `policy`.
///
/// Each attempt is bounded by the start-to-close timeout. Retryable executor
/// errors (and timeouts) are retried with exponential backoff; business
/// failures come back as `Ok` and are never retried.
pub async fn execute_with_policy(
    executor: &dyn UnitExecutor,
    input: &UnitInput,
    key: &IdempotencyKey,
    policy: &RetryPolicy,
) -> std::result::Result<UnitResult, ExecutorError> {
    let timeout = policy.start_to_close_timeout();
    let attempts = AtomicU32::new(0);

    let result = (|| async {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%key, attempt, "Executing unit attempt");
        match tokio::time::timeout(timeout, executor.execute(input)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExecutorError::Timeout(timeout)),
        }
    })
    .retry(policy.backoff())
    .when(ExecutorError::is_retryable)
    .notify(|err: &ExecutorError, delay: Duration| {
        warn!(%key, error = %err, ?delay, "Unit attempt failed, retrying");
    })
    .await;

    let attempts = attempts.load(Ordering::SeqCst);
    match &result {
        Ok(unit) => debug!(%key, attempts, success = unit.success, "Unit finished"),
        Err(err) => warn!(%key, attempts, error = %err, "Unit failed after retries"),
    }
    result
}
