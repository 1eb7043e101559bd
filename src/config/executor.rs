//! Unit executor configuration.

use std::time::Duration;

use serde::Deserialize;

/// Which executor runs each unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    #[default]
    Script,
    Http,
}

/// Unit executor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Executor type.
    pub kind: ExecutorKind,
    /// Script executor settings.
    pub script: ScriptConfig,
    /// HTTP executor settings.
    pub http: HttpConfig,
}

/// Script executor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Program to run. The order ref is appended as the last argument.
    pub program: String,
    /// Arguments placed before the order ref.
    pub args: Vec<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            program: "./scripts/unit.sh".to_string(),
            args: Vec::new(),
        }
    }
}

/// HTTP executor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL; the order ref is appended as the last path segment.
    pub endpoint: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/units".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
