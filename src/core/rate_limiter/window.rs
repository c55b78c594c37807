//! Rolling window bookkeeping

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Dispatch timestamps inside one rolling window
#[derive(Debug)]
pub(super) struct SlidingWindow {
    /// Request timestamps, oldest first
    pub(super) timestamps: VecDeque<Instant>,
    pub(super) window: Duration,
    pub(super) limit: u32,
}

impl SlidingWindow {
    pub(super) fn new(limit: u32, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity((limit as usize).min(1024)),
            window,
            limit,
        }
    }

    /// Remove expired timestamps
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Take a slot at `now` if one is free, otherwise return how long until
    /// the oldest dispatch leaves the window
    pub(super) fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        self.prune(now);

        if (self.timestamps.len() as u32) < self.limit {
            self.timestamps.push_back(now);
            return Ok(());
        }

        // A zero budget never frees up; poll once per window instead of spinning
        if self.timestamps.is_empty() {
            return Err(self.window.max(Duration::from_millis(1)));
        }

        Err(self.reset_after(now))
    }

    /// Time until the oldest dispatch expires
    pub(super) fn reset_after(&self, now: Instant) -> Duration {
        match self.timestamps.front() {
            Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Dispatches inside the window as of `now`
    pub(super) fn used(&mut self, now: Instant) -> u32 {
        self.prune(now);
        self.timestamps.len() as u32
    }
}
