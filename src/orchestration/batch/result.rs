//! Batch result accumulator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::unit::UnitResult;

/// Aggregate of one batch run.
///
/// `results` is pre-sized with one empty slot per input and indexed by input
/// position, so it lines up with `order_refs` regardless of completion order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub order_refs: Vec<String>,
    pub results: Vec<UnitResult>,
    pub total_count: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl BatchResult {
    pub(crate) fn new(order_refs: Vec<String>) -> Self {
        let total_count = order_refs.len();
        let start_time = Utc::now();
        Self {
            order_refs,
            results: vec![UnitResult::default(); total_count],
            total_count,
            success_count: 0,
            fail_count: 0,
            start_time,
            end_time: start_time,
        }
    }

    /// Write the result for slot `index` and count it.
    ///
    /// Each slot is written once; the dispatch loop never has two dispatches
    /// outstanding for the same index.
    pub(crate) fn record(&mut self, index: usize, result: UnitResult) {
        debug_assert!(
            self.results[index].order_ref.is_empty(),
            "slot {index} recorded twice"
        );
        if result.success {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.results[index] = result;
    }

    pub(crate) fn finish(&mut self) {
        self.end_time = if self.total_count == 0 {
            self.start_time
        } else {
            Utc::now()
        };
    }

    /// Slots that have been written.
    pub fn resolved_count(&self) -> usize {
        self.success_count + self.fail_count
    }

    /// Successful units as an integer percentage; 0 for an empty batch.
    pub fn success_rate(&self) -> usize {
        if self.total_count == 0 {
            return 0;
        }
        (self.success_count * 100) / self.total_count
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Results synthesized from duplicate-start signals.
    pub fn duplicate_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_duplicate()).count()
    }
}
