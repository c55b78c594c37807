//! Orchestrator construction

use crate::config::{EngineConfig, OrchestratorConfig, Validate};
use crate::core::cache_manager::CacheStore;
use crate::core::checkpoint::CheckpointStore;
use crate::core::clock::{Clock, SystemClock};
use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::RetryPolicy;
use crate::storage::{KvStore, MemoryKvStore, open_store};
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Drives batches of work items through cache, rate limiter, remote call,
/// retry policy and checkpoint store
///
/// Holds no per-run state, so one orchestrator can serve many runs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    pub(super) config: OrchestratorConfig,
    pub(super) cache: Arc<CacheStore>,
    pub(super) checkpoints: Arc<CheckpointStore>,
    pub(super) limiter: Arc<RateLimiter>,
    pub(super) retry: RetryPolicy,
    pub(super) clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Wire an orchestrator from configuration, opening the configured storage
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let store = open_store(&config.storage).await?;
        Self::builder().config(config).store(store).build()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Builder for [`Orchestrator`]
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn KvStore>>,
    cache_store: Option<Arc<dyn KvStore>>,
    checkpoint_store: Option<Arc<dyn KvStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OrchestratorBuilder {
    /// Engine configuration; validated in [`build`](Self::build)
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Backend for both the cache and the checkpoints
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Separate backend for the cache
    pub fn cache_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Separate backend for the checkpoints
    pub fn checkpoint_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Time source for backoff sleeps, cache expiry and record stamps
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;

        let shared = match self.store {
            Some(store) => store,
            None => {
                if self.cache_store.is_none() || self.checkpoint_store.is_none() {
                    warn!("No storage backend given; checkpoints will not survive a restart");
                }
                Arc::new(MemoryKvStore::new())
            }
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let cache = CacheStore::new(
            self.cache_store.unwrap_or_else(|| shared.clone()),
            self.config.cache.clone(),
        )
        .with_clock(clock.clone());

        let checkpoints = CheckpointStore::new(self.checkpoint_store.unwrap_or(shared))
            .with_clock(clock.clone())
            .with_write_policy(
                self.config.orchestrator.checkpoint_write_attempts,
                self.config.orchestrator.checkpoint_retry_delay(),
            );

        info!(
            max_workers = self.config.orchestrator.max_workers,
            endpoint_classes = self.config.rate_limits.len(),
            max_attempts = self.config.retry.max_attempts,
            cache_enabled = self.config.cache.enabled,
            "Orchestrator ready"
        );

        Ok(Orchestrator {
            config: self.config.orchestrator.clone(),
            cache: Arc::new(cache),
            checkpoints: Arc::new(checkpoints),
            limiter: Arc::new(RateLimiter::from_config(&self.config)),
            retry: RetryPolicy::new(self.config.retry.clone()),
            clock,
        })
    }
}
