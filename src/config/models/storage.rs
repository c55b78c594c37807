//! Storage configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Backend behind the cache and checkpoint stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// One file per key under `path`
    #[default]
    File,
    /// Redis server at `redis_url` (feature `redis`)
    Redis,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the file backend
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Redis URL for the redis backend
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Key namespace for the redis backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            redis_url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::File,
            path: path.into(),
            ..Self::default()
        }
    }
}
