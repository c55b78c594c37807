//! Core functionality for the engine
//!
//! Fingerprinting, caching, rate limiting, retries, checkpoints and the
//! orchestrator that ties them together.

pub mod batch;
pub mod cache_manager;
pub mod checkpoint;
pub mod clock;
pub mod fingerprint;
pub mod rate_limiter;
pub mod retry;
