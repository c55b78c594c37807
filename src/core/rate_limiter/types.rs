//! Rate limiter types and data structures

use serde::Serialize;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

/// Proof of admission for one remote call
///
/// Holds a concurrency slot until released or dropped. The rolling-window
/// slot it consumed expires on its own.
#[derive(Debug)]
pub struct RateLimitPermit {
    pub(super) endpoint_class: String,
    pub(super) acquired_at: Instant,
    pub(super) _slot: OwnedSemaphorePermit,
}

impl RateLimitPermit {
    /// Endpoint class this permit was charged against
    pub fn endpoint_class(&self) -> &str {
        &self.endpoint_class
    }

    /// How long the permit has been held
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Point-in-time view of one endpoint class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Endpoint class
    pub endpoint_class: String,
    /// Calls currently holding a concurrency slot
    pub in_flight: usize,
    /// Concurrency cap
    pub max_concurrent: usize,
    /// Dispatches inside the current rolling window
    pub window_used: u32,
    /// Maximum dispatches per window
    pub requests_per_window: u32,
    /// Dispatches still available in the window
    pub remaining: u32,
    /// Time until the oldest dispatch leaves the window
    pub reset_after: Duration,
}
