//! Application configuration.
//!
//! Aggregates batch, retry, substrate and executor settings into a single
//! Config struct that can be loaded from YAML files or environment variables.

mod executor;

pub use executor::{ExecutorConfig, ExecutorKind, HttpConfig, ScriptConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "fanout.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "FANOUT_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "FANOUT";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "FANOUT_LOG";
/// Environment variable selecting the log output format (`json` or text).
pub const LOG_FORMAT_ENV_VAR: &str = "FANOUT_LOG_FORMAT";

/// Concurrency applied when `max_concurrent` is unset or non-positive.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;
/// Default idempotency key type tag.
pub const DEFAULT_UNIT_TYPE: &str = "single-unit";

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::substrate::ReusePolicy;
use crate::utils::retry::RetryPolicy;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch orchestration settings.
    pub batch: BatchConfig,
    /// Per-unit retry policy.
    pub retry: RetryPolicy,
    /// Substrate settings.
    pub substrate: SubstrateConfig,
    /// Unit executor selection.
    pub executor: ExecutorConfig,
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum units dispatched at once. Values <= 0 fall back to
    /// `DEFAULT_MAX_CONCURRENT`.
    pub max_concurrent: i64,
    /// Type tag prefixed to every idempotency key.
    pub unit_type: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT as i64,
            unit_type: DEFAULT_UNIT_TYPE.to_string(),
        }
    }
}

/// Substrate settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    /// Whether a completed key may be executed again.
    pub reuse_policy: ReusePolicy,
}

/// Clamp a configured concurrency to a usable permit count.
///
/// Zero and negative values are corrected to the default rather than read as
/// "unlimited" or "none". Values above the permit pool's limit are capped at it.
pub fn normalize_max_concurrent(max_concurrent: i64) -> usize {
    if max_concurrent <= 0 {
        DEFAULT_MAX_CONCURRENT
    } else {
        usize::try_from(max_concurrent)
            .unwrap_or(usize::MAX)
            .min(Semaphore::MAX_PERMITS)
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `fanout.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` separated
    ///    (e.g. `FANOUT__BATCH__MAX_CONCURRENT=5`)
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            retry: RetryPolicy::fast(3),
            ..Default::default()
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),
}
