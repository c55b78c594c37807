//! Cache store type definitions
//!
//! This module contains the persisted cache entry and the statistics types.

use crate::core::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cached remote response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request fingerprint this response answers
    pub fingerprint: Fingerprint,
    /// Operation that produced the response
    pub operation: String,
    /// The cached response payload
    pub response: Value,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Time to live from `created_at`
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(
        fingerprint: Fingerprint,
        operation: impl Into<String>,
        response: Value,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            fingerprint,
            operation: operation.into(),
            response,
            created_at,
            ttl,
        }
    }

    /// Check if the entry is expired at `now`
    ///
    /// An entry is live for `[created_at, created_at + ttl)`. A creation time
    /// in the future (clock skew between writers) counts as fresh.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.created_at).to_std() {
            Ok(age) => age >= self.ttl,
            Err(_) => false,
        }
    }

    /// Get the age of the entry
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Atomic cache statistics for lock-free hot path updates
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    /// Lookups served from the cache
    pub hits: AtomicU64,
    /// Lookups that found nothing usable
    pub misses: AtomicU64,
    /// Successful writes
    pub writes: AtomicU64,
    /// Expired or unreadable entries removed
    pub evictions: AtomicU64,
    /// Backend read/write failures
    pub errors: AtomicU64,
}

/// Cache statistics snapshot (returned to callers)
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub errors: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl AtomicCacheStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}
