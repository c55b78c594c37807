//! Rate Limiting Implementation
//!
//! Provides per-endpoint-class admission control combining a rolling request
//! window with a concurrency cap. Waiters are served first-come-first-served.

mod limiter;
mod types;
mod window;


// Re-export public types
pub use limiter::RateLimiter;
pub use types::{RateLimitPermit, RateLimitStatus};
