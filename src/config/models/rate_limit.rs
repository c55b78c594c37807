//! Rate limiting configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limit for one endpoint class
///
/// Both budgets apply at once: at most `requests_per_window` dispatches in any
/// rolling `window_secs` window, and at most `max_concurrent` calls in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per rolling window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Maximum concurrent in-flight calls
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_window: u32, window: Duration, max_concurrent: usize) -> Self {
        Self {
            requests_per_window,
            window_secs: window.as_secs(),
            max_concurrent,
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}
