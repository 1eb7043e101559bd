//! Batch orchestration.
//!
//! `BatchOrchestrator::run_batch` fans an ordered list of units out through a
//! `Substrate`, keeps at most `max_concurrent` dispatches outstanding, refills
//! the budget as dispatches settle, and folds every outcome into a
//! `BatchResult`.
//!
//! Outcome classification per unit:
//! - `UnitResult` from the substrate: recorded as-is
//! - duplicate-start signal: recorded as success
//! - any other error: recorded as failure
//!
//! Only a substrate that cannot schedule the first unit fails the batch.

mod result;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::budget::{ConcurrencyBudget, Permit};
use super::selector::Selector;
use crate::config::{normalize_max_concurrent, BatchConfig, DEFAULT_UNIT_TYPE};
use crate::substrate::{Substrate, SubstrateError};
use crate::unit::{IdempotencyKey, UnitInput, UnitResult};

pub use result::BatchResult;

/// Errors that abort a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Substrate cannot schedule units: {0}")]
    Substrate(#[from] SubstrateError),

    #[error("Dispatch loop stalled with {completed}/{total} units resolved")]
    Stalled { completed: usize, total: usize },
}

/// Batch run settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum outstanding dispatches; `<= 0` selects the default.
    pub max_concurrent: i64,
    /// Type tag for idempotency keys.
    pub unit_type: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchConfig::default().into()
    }
}

impl From<BatchConfig> for BatchOptions {
    fn from(config: BatchConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            unit_type: config.unit_type,
        }
    }
}

impl BatchOptions {
    pub fn new(max_concurrent: i64) -> Self {
        Self {
            max_concurrent,
            unit_type: DEFAULT_UNIT_TYPE.to_string(),
        }
    }

    pub fn with_unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = unit_type.into();
        self
    }
}

/// Bookkeeping carried alongside one outstanding dispatch.
struct Slot {
    index: usize,
    order_ref: String,
    key: IdempotencyKey,
    dispatched_at: Instant,
    _permit: Permit,
}

/// Dispatches batches of units through a substrate.
pub struct BatchOrchestrator {
    substrate: Arc<dyn Substrate>,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(substrate: Arc<dyn Substrate>, options: BatchOptions) -> Self {
        Self { substrate, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Idempotency key for `order_ref` under this orchestrator's unit type.
    pub fn key_for(&self, order_ref: &str) -> IdempotencyKey {
        IdempotencyKey::derive(&self.options.unit_type, order_ref)
    }

    /// Run every unit and return the aggregated result.
    ///
    /// Dispatch issuance follows input order; results are stored by input
    /// index whatever order they settle in.
    #[tracing::instrument(
        name = "batch.run",
        skip_all,
        fields(
            batch_id = %Uuid::new_v4(),
            count = inputs.len(),
            max_concurrent = normalize_max_concurrent(self.options.max_concurrent),
        )
    )]
    pub async fn run_batch(&self, inputs: Vec<UnitInput>) -> Result<BatchResult, OrchestrationError> {
        let total = inputs.len();
        let order_refs: Vec<String> = inputs.iter().map(|i| i.order_ref.clone()).collect();
        let mut batch = BatchResult::new(order_refs);

        if total == 0 {
            batch.finish();
            info!("Empty batch, nothing to dispatch");
            return Ok(batch);
        }

        let budget = ConcurrencyBudget::new(self.options.max_concurrent);
        let mut outstanding: Selector<Slot, crate::substrate::Result<UnitResult>> = Selector::new();
        let mut pending = inputs.into_iter().enumerate();
        let mut num_scheduled = 0;
        let mut num_completed = 0;

        while num_completed < total {
            if num_scheduled < total {
                if let Some(permit) = budget.try_acquire() {
                    let Some((index, input)) = pending.next() else {
                        break;
                    };
                    num_scheduled += 1;

                    let order_ref = input.order_ref.clone();
                    let key = self.key_for(&order_ref);
                    let dispatched_at = Instant::now();
                    debug!(index, %key, "Dispatching unit");

                    match self.substrate.dispatch(key.clone(), input) {
                        Ok(future) => outstanding.push(
                            Slot {
                                index,
                                order_ref,
                                key,
                                dispatched_at,
                                _permit: permit,
                            },
                            future,
                        ),
                        Err(err) => {
                            if index == 0 && matches!(err, SubstrateError::Unavailable(_)) {
                                error!(error = %err, "Substrate unavailable before any unit was scheduled");
                                return Err(err.into());
                            }
                            drop(permit);
                            let result = self.classify(&order_ref, &key, dispatched_at, Err(err));
                            batch.record(index, result);
                            num_completed += 1;
                        }
                    }
                    continue;
                }
            }

            let Some((slot, outcome)) = outstanding.next_settled().await else {
                error!(completed = num_completed, total, "No outstanding dispatch to wait on");
                return Err(OrchestrationError::Stalled {
                    completed: num_completed,
                    total,
                });
            };

            let result = self.classify(&slot.order_ref, &slot.key, slot.dispatched_at, outcome);
            batch.record(slot.index, result);
            // Permit returns to the budget here
            drop(slot);
            num_completed += 1;
        }

        batch.finish();
        info!(
            total_count = batch.total_count,
            success_count = batch.success_count,
            fail_count = batch.fail_count,
            success_rate = batch.success_rate(),
            duration_ms = batch.duration().num_milliseconds(),
            "Batch completed"
        );
        Ok(batch)
    }

    /// Fold one dispatch outcome into the result stored for its slot.
    fn classify(
        &self,
        order_ref: &str,
        key: &IdempotencyKey,
        dispatched_at: Instant,
        outcome: crate::substrate::Result<UnitResult>,
    ) -> UnitResult {
        match outcome {
            Ok(mut result) => {
                if result.order_ref != order_ref {
                    if !result.order_ref.is_empty() {
                        warn!(%key, returned = %result.order_ref, "Executor returned a mismatched order ref");
                    }
                    result.order_ref = order_ref.to_string();
                }
                debug!(%key, success = result.success, "Unit resolved");
                result
            }
            Err(err) if self.substrate.is_duplicate_start(&err) => {
                info!(%key, "Unit already started - duplicate request handled correctly");
                UnitResult::duplicate(order_ref).with_duration(dispatched_at.elapsed())
            }
            Err(err) => {
                error!(%key, error = %err, "Unit dispatch failed");
                UnitResult::failed(order_ref, err.to_string()).with_duration(dispatched_at.elapsed())
            }
        }
    }
}
