//! Retry utilities: the per-unit retry policy and its backoff builder.
//!
//! Uses `backon` for exponential backoff. The policy bounds attempts, grows the
//! delay geometrically between them, and caps each attempt with a timeout.

use std::time::Duration;

use backon::ExponentialBuilder;
use serde::Deserialize;

/// Retry policy applied by the substrate to each unit.
///
/// Defaults:
/// - Initial interval: 1s
/// - Backoff coefficient: 2.0
/// - Max interval: 30s
/// - Max attempts: 5 (including the first)
/// - Start-to-close timeout: 2 min per attempt
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry, in milliseconds.
    pub initial_interval_ms: u64,
    /// Multiplier applied to the delay after each retry.
    pub backoff_coefficient: f32,
    /// Delay cap, in milliseconds.
    pub max_interval_ms: u64,
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Upper bound on a single attempt, in milliseconds.
    pub start_to_close_timeout_ms: u64,
    /// Randomise delays to avoid synchronised retries.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            backoff_coefficient: 2.0,
            max_interval_ms: 30_000,
            max_attempts: 5,
            start_to_close_timeout_ms: 120_000,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Policy for tests: millisecond delays, short attempt timeout.
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            initial_interval_ms: 1,
            backoff_coefficient: 2.0,
            max_interval_ms: 10,
            max_attempts,
            start_to_close_timeout_ms: 1_000,
            jitter: false,
        }
    }

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn start_to_close_timeout(&self) -> Duration {
        Duration::from_millis(self.start_to_close_timeout_ms)
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_attempts.saturating_sub(1) as usize
    }

    /// Backoff schedule for this policy.
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_interval())
            .with_max_delay(self.max_interval())
            .with_factor(self.backoff_coefficient)
            .with_max_times(self.max_retries());

        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}
