//! Configuration data models
//!
//! This module defines all configuration structures used throughout the engine.

#![allow(missing_docs)]

pub mod cache;
pub mod engine;
pub mod logging;
pub mod orchestrator;
pub mod rate_limit;
pub mod retry;
pub mod storage;

// Re-export all configuration types
pub use cache::*;
pub use engine::*;
pub use logging::*;
pub use orchestrator::*;
pub use rate_limit::*;
pub use retry::*;
pub use storage::*;

/// Default worker pool size
pub fn default_max_workers() -> usize {
    16
}

pub fn default_checkpoint_write_attempts() -> u32 {
    3
}

pub fn default_checkpoint_retry_delay_ms() -> u64 {
    50
}

pub fn default_progress_log_interval() -> usize {
    100
}

pub fn default_requests_per_window() -> u32 {
    60
}

pub fn default_window_secs() -> u64 {
    60
}

pub fn default_max_concurrent() -> usize {
    5
}

pub fn default_max_attempts() -> u32 {
    5
}

pub fn default_base_delay_ms() -> u64 {
    1000
}

pub fn default_max_delay_ms() -> u64 {
    60_000
}

pub fn default_jitter() -> f64 {
    0.2
}

pub fn default_cache_ttl_secs() -> u64 {
    86_400 // 24 hours
}

pub fn default_true() -> bool {
    true
}

pub fn default_storage_path() -> String {
    ".state".to_string()
}

pub fn default_key_prefix() -> String {
    "resumable-batch".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}
