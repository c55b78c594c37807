//! Retry policy with exponential backoff

use super::types::{ErrorClass, GiveUpReason, RetryDecision};
use crate::config::RetryConfig;
use crate::utils::error::{RemoteError, RemoteErrorKind};
use std::time::Duration;
use tracing::debug;

/// Failure classification plus backoff schedule
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Attempt ceiling, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Classify a remote failure
    pub fn classify(&self, error: &RemoteError) -> ErrorClass {
        match error.kind {
            RemoteErrorKind::Timeout
            | RemoteErrorKind::RateLimited
            | RemoteErrorKind::Server
            | RemoteErrorKind::ConnectionReset
            | RemoteErrorKind::Network => ErrorClass::Retryable,
            RemoteErrorKind::Authentication
            | RemoteErrorKind::Authorization
            | RemoteErrorKind::InvalidRequest
            | RemoteErrorKind::Validation
            | RemoteErrorKind::NotFound
            | RemoteErrorKind::Other => ErrorClass::NonRetryable,
        }
    }

    /// Un-jittered delay before retry number `retry` (zero-based), capped
    fn nominal_delay(&self, retry: u32) -> f64 {
        let base = self.config.base_delay().as_secs_f64();
        let max = self.config.max_delay().as_secs_f64();
        // 2^1024 overflows to infinity, which the cap absorbs
        (base * 2f64.powi(retry.min(1024) as i32)).min(max)
    }

    /// Backoff before retry number `retry` (zero-based: the first retry waits
    /// about `base_delay`)
    ///
    /// `base * 2^retry`, capped at `max_delay`, scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]` and capped again.
    pub fn next_delay(&self, retry: u32) -> Duration {
        let nominal = self.nominal_delay(retry);
        let jitter = self.config.jitter.clamp(0.0, 1.0);
        let factor = 1.0 - jitter + 2.0 * jitter * rand::random::<f64>();
        let max = self.config.max_delay().as_secs_f64();

        secs_to_duration((nominal * factor).clamp(0.0, max))
    }

    /// Inclusive range `next_delay(retry)` can return
    pub fn delay_bounds(&self, retry: u32) -> (Duration, Duration) {
        let nominal = self.nominal_delay(retry);
        let jitter = self.config.jitter.clamp(0.0, 1.0);
        let max = self.config.max_delay().as_secs_f64();

        (
            secs_to_duration((nominal * (1.0 - jitter)).clamp(0.0, max)),
            secs_to_duration((nominal * (1.0 + jitter)).clamp(0.0, max)),
        )
    }

    /// Backoff for `error`, stretched to honor a server `retry_after` hint
    pub fn delay_for(&self, retry: u32, error: &RemoteError) -> Duration {
        let delay = self.next_delay(retry);
        match error.retry_after() {
            Some(hint) if hint > delay => hint.min(self.config.max_delay()),
            _ => delay,
        }
    }

    /// Decide what happens after the `attempts`-th attempt failed with `error`
    pub fn decide(&self, attempts: u32, error: &RemoteError) -> RetryDecision {
        if !self.classify(error).is_retryable() {
            return RetryDecision::GiveUp(GiveUpReason::NonRetryable);
        }

        if attempts >= self.config.max_attempts {
            return RetryDecision::GiveUp(GiveUpReason::Exhausted { attempts });
        }

        let delay = self.delay_for(attempts.saturating_sub(1), error);
        debug!(
            attempts,
            delay_ms = delay.as_millis() as u64,
            kind = error.kind.as_str(),
            "Scheduling retry"
        );
        RetryDecision::RetryAfter(delay)
    }
}

/// Nearest whole nanosecond, so 1.0 * 1.2 seconds is exactly 1200ms
fn secs_to_duration(secs: f64) -> Duration {
    Duration::from_nanos((secs * 1e9).round() as u64)
}
