//! Durable key-value contract shared by the cache and checkpoint stores

use crate::utils::error::Result;
use async_trait::async_trait;

/// Key-value storage backend
///
/// Keys are `/`-separated strings such as `cache/<fingerprint>` or
/// `checkpoint/<run>/items/<item>`. Implementations must be safe for
/// concurrent use and, except for the memory backend, survive a process
/// restart.
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, sorted
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
