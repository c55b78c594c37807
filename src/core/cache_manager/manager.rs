//! Cache store implementation
//!
//! Responses are persisted through a [`KvStore`] under `cache/{fingerprint}`.
//! The cache is best-effort: backend failures degrade to misses on read and
//! are logged on write, never surfaced to the orchestrator.

use super::types::{AtomicCacheStats, CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::fingerprint::Fingerprint;
use crate::storage::KvStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};

const CACHE_PREFIX: &str = "cache/";

/// Fingerprint-addressed response cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Durable backend
    store: Arc<dyn KvStore>,
    /// Cache configuration
    config: CacheConfig,
    /// Time source for creation stamps and expiry
    clock: Arc<dyn Clock>,
    /// Cache statistics (lock-free atomics for hot path)
    stats: Arc<AtomicCacheStats>,
}

impl CacheStore {
    /// Create a new cache store
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            stats: Arc::new(AtomicCacheStats::default()),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn key(fingerprint: &Fingerprint) -> String {
        format!("{}{}", CACHE_PREFIX, fingerprint)
    }

    /// Get a live cached entry
    ///
    /// Expired and unreadable entries are reported as absent and removed on a
    /// best-effort basis.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        if !self.config.enabled {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let key = Self::key(fingerprint);
        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint.short(), error = %e, "Cache read failed, treating as miss");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(fingerprint = %fingerprint.short(), error = %e, "Discarding unreadable cache entry");
                self.evict(&key).await;
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !Self::is_valid(&entry, self.clock.now()) {
            debug!(fingerprint = %fingerprint.short(), "Cache entry expired");
            self.evict(&key).await;
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint.short(), operation = %entry.operation, "Cache hit");
        Some(entry)
    }

    /// Store a response
    ///
    /// Write failures are logged and swallowed.
    pub async fn put(
        &self,
        fingerprint: &Fingerprint,
        operation: &str,
        response: &Value,
        ttl: Duration,
    ) {
        if !self.config.enabled {
            return;
        }

        let entry = CacheEntry::new(
            fingerprint.clone(),
            operation,
            response.clone(),
            self.clock.now(),
            ttl,
        );

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(fingerprint = %fingerprint.short(), error = %e, "Failed to encode cache entry");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        match self.store.put(&Self::key(fingerprint), bytes).await {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = %fingerprint.short(), operation = %operation, ttl_secs = ttl.as_secs(), "Cached response");
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint.short(), error = %e, "Cache write failed");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Whether `entry` may still be served at `now`
    pub fn is_valid(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        !entry.is_expired(now)
    }

    /// TTL configured for an operation
    pub fn ttl_for(&self, operation: &str) -> Duration {
        self.config.ttl_for(operation)
    }

    /// Remove a single entry
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.store.delete(&Self::key(fingerprint)).await
    }

    /// Delete every expired or unreadable entry, returning how many went
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let keys = self.store.list_prefix(CACHE_PREFIX).await?;
        let mut removed = 0;

        for key in keys {
            let stale = match self.store.get(&key).await? {
                Some(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) => !Self::is_valid(&entry, now),
                    Err(_) => true,
                },
                None => false,
            };

            if stale {
                self.store.delete(&key).await?;
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                removed += 1;
            }
        }

        info!(removed, "Purged expired cache entries");
        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Reset statistics counters
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    async fn evict(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to evict cache entry");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
