//! Deterministic idempotency keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key the substrate deduplicates dispatches on.
///
/// Derived as `<unit_type>-<order_ref>`. The same pair always yields the same
/// key, across retries of the batch and across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn derive(unit_type: &str, order_ref: &str) -> Self {
        Self(format!("{unit_type}-{order_ref}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
