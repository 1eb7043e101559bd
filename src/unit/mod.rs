//! Units of work and the executor contract.
//!
//! A unit is one independently schedulable job in a batch, identified by its
//! order reference. `UnitExecutor` runs one attempt of a unit and classifies
//! the outcome:
//! - `Ok(UnitResult { success: false, .. })`: business failure, never retried
//! - `Err(ExecutorError)`: infrastructure failure, retried by the substrate
//!
//! - `script`: runs an external program per unit
//! - `http`: POSTs the unit payload to a remote endpoint

pub mod http;
pub mod key;
pub mod script;
mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ExecutorConfig, ExecutorKind};

pub use http::HttpExecutor;
pub use key::IdempotencyKey;
pub use script::ScriptExecutor;
pub use types::{UnitInput, UnitResult, DUPLICATE_START_MESSAGE};

/// Infrastructure failures raised by a unit executor.
///
/// Business outcomes never appear here; they are reported through
/// `UnitResult::success`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Executor failed: {0}")]
    Failed(String),
}

impl ExecutorError {
    /// Whether another attempt of the same unit may succeed.
    ///
    /// `Failed` is a permanent executor fault (bad configuration, invalid
    /// input) and is not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutorError::Io(_) | ExecutorError::Http(_) | ExecutorError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::Io(err.to_string())
    }
}

/// Runs a single attempt of a unit of work.
#[async_trait]
pub trait UnitExecutor: Send + Sync {
    /// Execute one attempt for `input`.
    async fn execute(&self, input: &UnitInput) -> Result<UnitResult, ExecutorError>;

    /// Executor name (used for tracing).
    fn name(&self) -> &str;
}

/// Build the executor selected by configuration.
pub fn build_executor(config: &ExecutorConfig) -> Result<Arc<dyn UnitExecutor>, ExecutorError> {
    match config.kind {
        ExecutorKind::Script => Ok(Arc::new(ScriptExecutor::new(
            config.script.program.clone(),
            config.script.args.clone(),
        ))),
        ExecutorKind::Http => Ok(Arc::new(HttpExecutor::new(
            config.http.endpoint.clone(),
            config.http.timeout(),
        )?)),
    }
}
