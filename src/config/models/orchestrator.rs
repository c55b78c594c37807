//! Orchestrator configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool and checkpoint durability settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Concurrent workers; cache hits never touch the rate limiter, so this is
    /// usually larger than any endpoint class's `max_concurrent`
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Tries per checkpoint write before the run is aborted
    #[serde(default = "default_checkpoint_write_attempts")]
    pub checkpoint_write_attempts: u32,
    /// Pause between checkpoint write tries (milliseconds)
    #[serde(default = "default_checkpoint_retry_delay_ms")]
    pub checkpoint_retry_delay_ms: u64,
    /// Emit a progress line every N terminal items; 0 disables it
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            checkpoint_write_attempts: default_checkpoint_write_attempts(),
            checkpoint_retry_delay_ms: default_checkpoint_retry_delay_ms(),
            progress_log_interval: default_progress_log_interval(),
        }
    }
}

impl OrchestratorConfig {
    pub fn checkpoint_retry_delay(&self) -> Duration {
        Duration::from_millis(self.checkpoint_retry_delay_ms)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }
}
