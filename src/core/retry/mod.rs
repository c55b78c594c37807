//! Retry policy
//!
//! Classifies remote failures and computes the backoff schedule. The
//! orchestrator owns the actual waiting, so the policy itself is pure apart
//! from jitter.

mod policy;
mod types;


pub use policy::RetryPolicy;
pub use types::{ErrorClass, GiveUpReason, RetryDecision};
