//! Helper functions for creating specific error types

use super::types::BatchError;

/// Helper functions for creating specific errors
impl BatchError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage(message.into())
    }

    pub fn checkpoint_unavailable<R, I, S>(run_key: R, item_id: I, reason: S) -> Self
    where
        R: Into<String>,
        I: Into<String>,
        S: Into<String>,
    {
        Self::CheckpointUnavailable {
            run_key: run_key.into(),
            item_id: item_id.into(),
            reason: reason.into(),
        }
    }

    pub fn run_aborted<R: Into<String>>(run_key: R, pending: usize) -> Self {
        Self::RunAborted {
            run_key: run_key.into(),
            pending,
        }
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Whether this error ends a run early
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::CheckpointUnavailable { .. } | Self::RunAborted { .. } | Self::Config(_)
        )
    }

    /// Whether this is a storage-level failure
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => true,
            #[cfg(feature = "redis")]
            Self::Redis(_) => true,
            _ => false,
        }
    }
}
