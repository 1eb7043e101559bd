//! Durable execution substrate abstraction.
//!
//! `Substrate` is the narrow interface the batch orchestrator dispatches units
//! through. Implementations guarantee at most one concurrently running
//! execution per idempotency key and run each unit under its retry policy.
//!
//! - `local/`: in-process substrate backed by a key registry and tokio tasks

pub mod local;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::unit::{ExecutorError, IdempotencyKey, UnitInput, UnitResult};

pub use local::{KeyStatus, LocalSubstrate};

/// Result type for substrate operations.
pub type Result<T> = std::result::Result<T, SubstrateError>;

/// Handle to one dispatched unit. Resolves once the unit's execution
/// (including its retries) has finished.
pub type DispatchFuture = BoxFuture<'static, Result<UnitResult>>;

/// Errors that can occur while dispatching or running a unit.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubstrateError {
    #[error("Execution already started for key '{key}'")]
    AlreadyStarted { key: IdempotencyKey },

    #[error("Substrate unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid unit input: {0}")]
    InvalidInput(String),

    #[error("Execution of '{key}' failed: {source}")]
    Execution {
        key: IdempotencyKey,
        #[source]
        source: ExecutorError,
    },

    #[error("Execution of '{key}' was cancelled: {reason}")]
    Cancelled { key: IdempotencyKey, reason: String },
}

/// What the substrate does when a key that already finished is dispatched again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReusePolicy {
    /// Reject any key that is running or has ever run.
    #[default]
    RejectDuplicate,
    /// Reject a key only while it is running; allow re-execution afterwards.
    AllowDuplicate,
}

/// Interface consumed by the batch orchestrator.
pub trait Substrate: Send + Sync {
    /// Schedule one unit under `key`.
    ///
    /// A synchronous `Err` means nothing was scheduled. Errors raised after
    /// scheduling are delivered through the returned future.
    fn dispatch(&self, key: IdempotencyKey, input: UnitInput) -> Result<DispatchFuture>;

    /// Whether `error` reports that `key` already has an execution.
    fn is_duplicate_start(&self, error: &SubstrateError) -> bool {
        matches!(error, SubstrateError::AlreadyStarted { .. })
    }
}
