//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.

use super::models::*;
use crate::utils::error::{BatchError, Result};
use tracing::debug;

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        debug!("Validating engine configuration");

        self.orchestrator.validate()?;
        self.retry.validate()?;
        self.cache.validate()?;
        self.storage.validate()?;

        for (class, limit) in &self.rate_limits {
            if class.trim().is_empty() {
                return Err(BatchError::config("Endpoint class name cannot be empty"));
            }
            limit
                .validate()
                .map_err(|e| BatchError::config(format!("Rate limit '{}': {}", class, e)))?;
        }

        if let Some(limit) = &self.default_rate_limit {
            limit
                .validate()
                .map_err(|e| BatchError::config(format!("Default rate limit: {}", e)))?;
        }

        Ok(())
    }
}

impl Validate for OrchestratorConfig {
    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BatchError::config("max_workers must be greater than 0"));
        }
        if self.checkpoint_write_attempts == 0 {
            return Err(BatchError::config(
                "checkpoint_write_attempts must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<()> {
        if self.requests_per_window == 0 {
            return Err(BatchError::config(
                "requests_per_window must be greater than 0",
            ));
        }
        if self.window_secs == 0 {
            return Err(BatchError::config("window_secs must be greater than 0"));
        }
        if self.max_concurrent == 0 {
            return Err(BatchError::config("max_concurrent must be greater than 0"));
        }
        Ok(())
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(BatchError::config("max_attempts must be greater than 0"));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(BatchError::config(format!(
                "jitter must be in [0, 1), got {}",
                self.jitter
            )));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(BatchError::config(format!(
                "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.default_ttl_secs == 0 {
            return Err(BatchError::config("default_ttl_secs must be greater than 0"));
        }
        if let Some((operation, _)) = self.ttl_per_operation.iter().find(|(_, ttl)| **ttl == 0) {
            return Err(BatchError::config(format!(
                "TTL for operation '{}' must be greater than 0",
                operation
            )));
        }
        Ok(())
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        match self.backend {
            StorageBackend::Memory => Ok(()),
            StorageBackend::File if self.path.trim().is_empty() => Err(BatchError::config(
                "File storage backend requires a path",
            )),
            StorageBackend::File => Ok(()),
            StorageBackend::Redis => match &self.redis_url {
                Some(url) if !url.trim().is_empty() => Ok(()),
                _ => Err(BatchError::config(
                    "Redis storage backend requires redis_url",
                )),
            },
        }
    }
}
