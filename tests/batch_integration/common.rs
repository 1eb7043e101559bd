//! Shared test fixtures and helpers for batch integration tests.

pub use std::collections::{HashMap, HashSet};
pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;

pub use async_trait::async_trait;
pub use tokio_test::{assert_err, assert_ok};

pub use fanout::orchestration::{BatchOptions, BatchOrchestrator, BatchResult, OrchestrationError};
pub use fanout::substrate::{KeyStatus, LocalSubstrate, ReusePolicy, Substrate, SubstrateError};
pub use fanout::unit::{
    ExecutorError, IdempotencyKey, UnitExecutor, UnitInput, UnitResult, DUPLICATE_START_MESSAGE,
};
pub use fanout::utils::retry::RetryPolicy;

pub const UNIT_TYPE: &str = "it-unit";

/// Executor that records every call and the peak number of calls in flight.
///
/// Refs listed in `rejected` report a business failure; refs in `flaky` fail
/// once with a retryable error before succeeding.
pub struct RecordingExecutor {
    delay: Duration,
    rejected: HashSet<String>,
    flaky: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
}

impl RecordingExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            rejected: HashSet::new(),
            flaky: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn rejecting(mut self, order_ref: &str) -> Self {
        self.rejected.insert(order_ref.to_string());
        self
    }

    pub fn flaky(self, order_ref: &str) -> Self {
        self.flaky.lock().unwrap().insert(order_ref.to_string());
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self, order_ref: &str) -> usize {
        self.calls.lock().unwrap().get(order_ref).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl UnitExecutor for RecordingExecutor {
    async fn execute(&self, input: &UnitInput) -> Result<UnitResult, ExecutorError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(input.order_ref.clone())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.flaky.lock().unwrap().remove(&input.order_ref) {
            return Err(ExecutorError::Io("connection reset".to_string()));
        }
        if self.rejected.contains(&input.order_ref) {
            return Ok(UnitResult::failed(&input.order_ref, "insufficient funds"));
        }
        Ok(UnitResult::succeeded(&input.order_ref, "ok"))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Build a local substrate around `executor` with a fast retry policy.
pub fn local_substrate(executor: Arc<RecordingExecutor>, reuse_policy: ReusePolicy) -> Arc<LocalSubstrate> {
    Arc::new(LocalSubstrate::new(executor, RetryPolicy::fast(3)).with_reuse_policy(reuse_policy))
}

pub fn orchestrator(substrate: Arc<LocalSubstrate>, max_concurrent: i64) -> BatchOrchestrator {
    let substrate: Arc<dyn Substrate> = substrate;
    BatchOrchestrator::new(substrate, BatchOptions::new(max_concurrent).with_unit_type(UNIT_TYPE))
}

pub fn key(order_ref: &str) -> IdempotencyKey {
    IdempotencyKey::derive(UNIT_TYPE, order_ref)
}

pub fn inputs(refs: &[&str]) -> Vec<UnitInput> {
    refs.iter().map(|r| UnitInput::new(*r)).collect()
}

/// Ten distinct order refs.
pub fn order_refs() -> Vec<&'static str> {
    vec![
        "7307", "5493", "7387", "2614", "5999", "3078", "8577", "5479", "6606", "8448",
    ]
}

/// Every slot is filled and lines up with its input.
pub fn assert_aligned(result: &BatchResult) {
    assert_eq!(result.results.len(), result.total_count);
    assert_eq!(result.success_count + result.fail_count, result.total_count);
    for (order_ref, unit) in result.order_refs.iter().zip(&result.results) {
        assert_eq!(&unit.order_ref, order_ref);
    }
}
