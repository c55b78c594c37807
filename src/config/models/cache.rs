//! Cache configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Response cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    /// TTL overrides keyed by operation name, in seconds
    #[serde(default)]
    pub ttl_per_operation: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: default_cache_ttl_secs(),
            ttl_per_operation: HashMap::new(),
        }
    }
}

impl CacheConfig {
    /// TTL for an operation, falling back to the default
    pub fn ttl_for(&self, operation: &str) -> Duration {
        let secs = self
            .ttl_per_operation
            .get(operation)
            .copied()
            .unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }

    /// Override the TTL for one operation
    ///
    /// TTLs are kept in whole seconds; a partial second rounds up, so a
    /// non-zero duration never becomes an entry that is born expired.
    pub fn with_operation_ttl(mut self, operation: impl Into<String>, ttl: Duration) -> Self {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self.ttl_per_operation.insert(operation.into(), secs);
        self
    }
}
