//! Error types for the batch engine

use super::remote::RemoteError;
use thiserror::Error;

/// Result type alias for the batch engine
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch engine
///
/// Per-item remote failures are carried as data inside a `BatchResult`; only
/// `CheckpointUnavailable`, `RunAborted` and setup errors ever escape a run.
/// `Cancelled` comes from lower-level waits that a run absorbs.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Retryable remote failure (timeout, 429, 5xx, connection reset)
    #[error("Transient remote error: {0}")]
    TransientRemote(RemoteError),

    /// Non-retryable remote failure (auth, malformed request, not found)
    #[error("Permanent remote error: {0}")]
    PermanentRemote(RemoteError),

    /// Key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Checkpoint writes kept failing, resumability can no longer be guaranteed
    #[error("Checkpoint unavailable for run '{run_key}' (item '{item_id}'): {reason}")]
    CheckpointUnavailable {
        run_key: String,
        item_id: String,
        reason: String,
    },

    /// Run cancelled by the caller
    #[error("Run '{run_key}' aborted with {pending} item(s) still pending")]
    RunAborted { run_key: String, pending: usize },

    /// A wait was abandoned because its cancellation token fired
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
