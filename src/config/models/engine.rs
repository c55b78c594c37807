//! Top-level engine configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete engine configuration
///
/// Everything the orchestrator needs is passed in through this struct; there
/// are no process-wide singletons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool and checkpoint settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Rate limits keyed by endpoint class
    #[serde(default)]
    pub rate_limits: HashMap<String, RateLimitConfig>,
    /// Limit applied to endpoint classes without an explicit entry
    #[serde(default)]
    pub default_rate_limit: Option<RateLimitConfig>,
    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Cache and checkpoint backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Add or replace the limit for an endpoint class
    pub fn with_rate_limit(mut self, endpoint_class: impl Into<String>, limit: RateLimitConfig) -> Self {
        self.rate_limits.insert(endpoint_class.into(), limit);
        self
    }

    pub fn with_default_rate_limit(mut self, limit: RateLimitConfig) -> Self {
        self.default_rate_limit = Some(limit);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Limit for an endpoint class, if one is configured
    pub fn rate_limit_for(&self, endpoint_class: &str) -> Option<&RateLimitConfig> {
        self.rate_limits
            .get(endpoint_class)
            .or(self.default_rate_limit.as_ref())
    }
}
