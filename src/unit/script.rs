//! Script-backed unit executor.
//!
//! Runs `program args... <order_ref>` once per attempt. The script itself may
//! be non-idempotent; deduplication is left to the substrate's key registry.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExecutorError, UnitExecutor, UnitInput, UnitResult};

/// Environment variable the unit payload is passed through, as JSON.
pub const PAYLOAD_ENV_VAR: &str = "FANOUT_UNIT_PAYLOAD";

/// Executes a unit by running an external program.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    program: String,
    args: Vec<String>,
}

impl ScriptExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl UnitExecutor for ScriptExecutor {
    #[tracing::instrument(name = "unit.script", skip_all, fields(order_ref = %input.order_ref))]
    async fn execute(&self, input: &UnitInput) -> Result<UnitResult, ExecutorError> {
        if input.order_ref.is_empty() {
            return Err(ExecutorError::Failed("order_ref must not be empty".to_string()));
        }

        debug!(program = %self.program, "Running unit script");
        let started = Instant::now();

        // Spawn failures are infrastructure errors; the exit status is business outcome.
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&input.order_ref)
            .env(PAYLOAD_ENV_VAR, input.payload.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let elapsed = started.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let exit_code = output.status.code();

        let result = if output.status.success() {
            debug!(?elapsed, "Unit script succeeded");
            UnitResult::succeeded(&input.order_ref, stdout)
        } else {
            let message = match exit_code {
                Some(code) => format!("script failed with exit code: {code}"),
                None => "script terminated by signal".to_string(),
            };
            warn!(
                ?exit_code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Unit script failed"
            );
            let mut failed = UnitResult::failed(&input.order_ref, message);
            failed.output = stdout;
            failed
        };

        Ok(result.with_duration(elapsed).with_exit_code(exit_code))
    }

    fn name(&self) -> &str {
        "script"
    }
}
