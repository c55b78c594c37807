//! Periodic progress reporting for a running batch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::info;

/// Counts terminal transitions and logs every `interval` of them
#[derive(Debug)]
pub(super) struct ProgressTracker {
    run_key: String,
    total: usize,
    interval: usize,
    done: AtomicUsize,
    started: Instant,
}

impl ProgressTracker {
    /// `already_done` items were terminal before this run started
    pub(super) fn new(run_key: &str, total: usize, already_done: usize, interval: usize) -> Self {
        Self {
            run_key: run_key.to_string(),
            total,
            interval,
            done: AtomicUsize::new(already_done),
            started: Instant::now(),
        }
    }

    /// Record `count` newly terminal items
    pub(super) fn advance(&self, count: usize) {
        let before = self.done.fetch_add(count, Ordering::Relaxed);
        let after = before + count;

        if self.interval == 0 || before / self.interval == after / self.interval {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let percentage = if self.total == 0 {
            100.0
        } else {
            after as f64 * 100.0 / self.total as f64
        };
        info!(
            run_key = %self.run_key,
            done = after,
            total = self.total,
            percentage = (percentage * 10.0).round() / 10.0,
            elapsed_secs = (elapsed * 10.0).round() / 10.0,
            "Batch progress"
        );
    }

    pub(super) fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}
