//! Retry classification and decision types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Whether a failure may succeed if the same request is sent again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retryable => f.write_str("retryable"),
            Self::NonRetryable => f.write_str("non_retryable"),
        }
    }
}

/// Why an item stops being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The failure will not go away by retrying
    NonRetryable,
    /// Retryable, but the attempt budget is spent
    Exhausted { attempts: u32 },
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonRetryable => f.write_str("non-retryable error"),
            Self::Exhausted { attempts } => write!(f, "retries exhausted after {} attempts", attempts),
        }
    }
}

/// Outcome of applying the retry policy to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Dispatch again once the delay has elapsed
    RetryAfter(Duration),
    /// Mark the item Failed
    GiveUp(GiveUpReason),
}
