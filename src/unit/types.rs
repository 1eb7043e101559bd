//! Unit input and result records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message recorded on a unit whose dispatch hit an existing execution.
pub const DUPLICATE_START_MESSAGE: &str = "duplicate request handled correctly";

/// Immutable description of one job in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInput {
    /// Caller-supplied reference, unique within a batch and stable across
    /// resubmissions.
    pub order_ref: String,
    /// Executor-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl UnitInput {
    pub fn new(order_ref: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Outcome of one dispatched unit.
///
/// `Default` yields the empty slot value the batch accumulator pre-sizes with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub order_ref: String,
    pub success: bool,
    /// Diagnostic payload (script stdout, response body).
    #[serde(default)]
    pub output: String,
    /// Empty on success.
    #[serde(default)]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub execution_duration: Duration,
    pub timestamp: DateTime<Utc>,
}

impl UnitResult {
    pub fn succeeded(order_ref: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            success: true,
            output: output.into(),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    pub fn failed(order_ref: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            success: false,
            error_message: error_message.into(),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Result synthesized when the substrate reports a duplicate start.
    ///
    /// Counted as success: the key already has an execution, and no second one
    /// was started.
    pub fn duplicate(order_ref: impl Into<String>) -> Self {
        Self {
            order_ref: order_ref.into(),
            success: true,
            error_message: DUPLICATE_START_MESSAGE.to_string(),
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.execution_duration = duration;
        self
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// True for a result synthesized from a duplicate-start signal.
    pub fn is_duplicate(&self) -> bool {
        self.success && self.error_message == DUPLICATE_START_MESSAGE
    }
}
