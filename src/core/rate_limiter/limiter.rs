//! Core rate limiter implementation

use super::types::{RateLimitPermit, RateLimitStatus};
use super::window::SlidingWindow;
use crate::config::{EngineConfig, RateLimitConfig};
use crate::utils::error::{BatchError, Result};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Budget state for one endpoint class
#[derive(Debug)]
pub(super) struct ClassLimiter {
    pub(super) config: RateLimitConfig,
    /// Concurrency slots; tokio's semaphore serves waiters in FIFO order
    pub(super) slots: Arc<Semaphore>,
    /// Admission turn; tokio's mutex is fair, so waiters are admitted in
    /// arrival order and a late arrival cannot overtake a sleeping waiter
    pub(super) turn: Mutex<()>,
    /// Rolling window of dispatch timestamps
    pub(super) window: parking_lot::Mutex<SlidingWindow>,
}

impl ClassLimiter {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent)),
            turn: Mutex::new(()),
            window: parking_lot::Mutex::new(SlidingWindow::new(
                config.requests_per_window,
                config.window(),
            )),
            config,
        }
    }
}

/// Per-endpoint-class rate limiter
///
/// Each class has two independent budgets: a rolling request window and a
/// concurrency cap. Classes without an explicit limit share the shape of the
/// default limit but get their own budget.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Explicit limits by endpoint class
    pub(super) limits: HashMap<String, RateLimitConfig>,
    /// Limit for classes not listed in `limits`
    pub(super) default_limit: Option<RateLimitConfig>,
    /// Lazily created budgets
    pub(super) classes: Arc<DashMap<String, Arc<ClassLimiter>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(
        limits: HashMap<String, RateLimitConfig>,
        default_limit: Option<RateLimitConfig>,
    ) -> Self {
        Self {
            limits,
            default_limit,
            classes: Arc::new(DashMap::new()),
        }
    }

    /// Build from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.rate_limits.clone(), config.default_rate_limit.clone())
    }

    /// Limiter with a single class
    pub fn single(endpoint_class: impl Into<String>, config: RateLimitConfig) -> Self {
        let mut limits = HashMap::new();
        limits.insert(endpoint_class.into(), config);
        Self::new(limits, None)
    }

    /// Whether `endpoint_class` has a limit, explicit or default
    pub fn has_limit(&self, endpoint_class: &str) -> bool {
        self.limits.contains_key(endpoint_class) || self.default_limit.is_some()
    }

    /// Limit that applies to `endpoint_class`
    pub fn limit_for(&self, endpoint_class: &str) -> Option<&RateLimitConfig> {
        self.limits
            .get(endpoint_class)
            .or(self.default_limit.as_ref())
    }

    pub(super) fn class(&self, endpoint_class: &str) -> Result<Arc<ClassLimiter>> {
        if let Some(existing) = self.classes.get(endpoint_class) {
            return Ok(existing.value().clone());
        }

        let config = self.limit_for(endpoint_class).cloned().ok_or_else(|| {
            BatchError::config(format!(
                "No rate limit configured for endpoint class '{}'",
                endpoint_class
            ))
        })?;

        let limiter = self
            .classes
            .entry(endpoint_class.to_string())
            .or_insert_with(|| Arc::new(ClassLimiter::new(config)))
            .value()
            .clone();
        Ok(limiter)
    }

    /// Wait for a concurrency slot and a window slot on `endpoint_class`
    ///
    /// Returns [`BatchError::Cancelled`] if `cancel` fires first. An abandoned
    /// wait, whether cancelled or dropped, consumes neither budget.
    pub async fn acquire(
        &self,
        endpoint_class: &str,
        cancel: &CancellationToken,
    ) -> Result<RateLimitPermit> {
        let class = self.class(endpoint_class)?;

        let admission = async {
            let _turn = class.turn.lock().await;

            let slot = class.slots.clone().acquire_owned().await.map_err(|_| {
                BatchError::config(format!(
                    "Rate limiter for '{}' was shut down",
                    endpoint_class
                ))
            })?;

            loop {
                let taken = class.window.lock().try_take(Instant::now());
                let wait = match taken {
                    Ok(()) => break,
                    Err(wait) => wait,
                };
                debug!(
                    endpoint_class = %endpoint_class,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limit window full, waiting"
                );
                tokio::time::sleep(wait).await;
            }

            Ok::<_, BatchError>(RateLimitPermit {
                endpoint_class: endpoint_class.to_string(),
                acquired_at: Instant::now(),
                _slot: slot,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(endpoint_class = %endpoint_class, "Abandoned rate limit wait");
                Err(BatchError::cancelled(format!(
                    "rate limit wait for '{}' cancelled",
                    endpoint_class
                )))
            }
            permit = admission => permit,
        }
    }

    /// Return a concurrency slot
    pub fn release(&self, permit: RateLimitPermit) {
        debug!(
            endpoint_class = %permit.endpoint_class,
            held_ms = permit.held_for().as_millis() as u64,
            "Released rate limit permit"
        );
        drop(permit);
    }

    /// Get current status for an endpoint class
    pub fn status(&self, endpoint_class: &str) -> Result<RateLimitStatus> {
        let class = self.class(endpoint_class)?;
        let now = Instant::now();

        let (window_used, reset_after) = {
            let mut window = class.window.lock();
            let used = window.used(now);
            (used, window.reset_after(now))
        };

        Ok(RateLimitStatus {
            endpoint_class: endpoint_class.to_string(),
            in_flight: class
                .config
                .max_concurrent
                .saturating_sub(class.slots.available_permits()),
            max_concurrent: class.config.max_concurrent,
            window_used,
            requests_per_window: class.config.requests_per_window,
            remaining: class.config.requests_per_window.saturating_sub(window_used),
            reset_after,
        })
    }
}
