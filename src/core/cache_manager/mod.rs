//! Fingerprint-addressed response cache
//!
//! This module stores remote responses keyed by request fingerprint so a
//! repeated request is answered without touching the remote API.

pub mod manager;
pub mod types;


pub use manager::CacheStore;
pub use types::{AtomicCacheStats, CacheEntry, CacheStats};
