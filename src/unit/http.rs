//! HTTP-backed unit executor.
//!
//! POSTs the unit payload to `<endpoint>/<order_ref>`. The order ref travels in
//! the path so the downstream service can key its own idempotency on it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExecutorError, UnitExecutor, UnitInput, UnitResult};

/// Response body the downstream service is expected to return.
#[derive(Debug, Deserialize)]
struct UnitResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

/// Executes a unit by calling a remote HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExecutor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::Failed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// URL a unit is posted to.
    pub fn unit_url(&self, order_ref: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), order_ref)
    }

    /// Classify a completed HTTP exchange into a business outcome.
    fn classify(order_ref: &str, status: reqwest::StatusCode, body: &str) -> UnitResult {
        if !status.is_success() {
            return UnitResult::failed(
                order_ref,
                format!(
                    "unexpected status code: {}, body: {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                ),
            );
        }

        match serde_json::from_str::<UnitResponse>(body) {
            Ok(response) if response.success => UnitResult::succeeded(order_ref, body),
            Ok(response) => {
                let mut failed = UnitResult::failed(order_ref, response.message);
                failed.output = body.to_string();
                failed
            }
            Err(e) => UnitResult::failed(order_ref, format!("failed to parse response: {e}")),
        }
    }
}

#[async_trait]
impl UnitExecutor for HttpExecutor {
    #[tracing::instrument(name = "unit.http", skip_all, fields(order_ref = %input.order_ref))]
    async fn execute(&self, input: &UnitInput) -> Result<UnitResult, ExecutorError> {
        if input.order_ref.is_empty() {
            return Err(ExecutorError::Failed("order_ref must not be empty".to_string()));
        }

        let url = self.unit_url(&input.order_ref);
        debug!(%url, "Posting unit");
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(&input.payload)
            .send()
            .await
            .map_err(|e| ExecutorError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutorError::Http(e.to_string()))?;

        let result = Self::classify(&input.order_ref, status, &body);
        if !result.success {
            warn!(status = status.as_u16(), error = %result.error_message, "Unit rejected by endpoint");
        }

        Ok(result.with_duration(started.elapsed()))
    }

    fn name(&self) -> &str {
        "http"
    }
}
