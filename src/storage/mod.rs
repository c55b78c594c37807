//! Storage layer for the engine
//!
//! The cache and the checkpoint store both persist through a small
//! key-value abstraction, so any backend that can hold bytes under string
//! keys can carry a run across process restarts.

/// File storage module
pub mod files;
/// Key-value abstraction
pub mod kv;
/// In-memory backend
pub mod memory;
/// Redis backend
#[cfg(feature = "redis")]
pub mod redis;

use crate::config::{StorageBackend, StorageConfig};
use crate::utils::error::{BatchError, Result};
use std::sync::Arc;
use tracing::info;

pub use files::FileKvStore;
pub use kv::KvStore;
pub use memory::MemoryKvStore;
#[cfg(feature = "redis")]
pub use redis::RedisKvStore;

/// Open the backend selected by configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryKvStore::new()),
        StorageBackend::File => Arc::new(FileKvStore::new(&config.path).await?),
        #[cfg(feature = "redis")]
        StorageBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                BatchError::config("storage.redis_url is required for the redis backend")
            })?;
            Arc::new(RedisKvStore::connect(url, &config.key_prefix).await?)
        }
        #[cfg(not(feature = "redis"))]
        StorageBackend::Redis => {
            return Err(BatchError::config(
                "redis backend requested but the crate was built without the `redis` feature",
            ));
        }
    };

    info!(backend = store.name(), "Storage backend opened");
    Ok(store)
}
