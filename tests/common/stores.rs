//! Storage backends with injected faults

use async_trait::async_trait;
use resumable_batch::{BatchError, KvStore, MemoryKvStore, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Memory store whose writes under `prefix` fail while `failing` is set
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryKvStore,
    prefix: String,
    failing: AtomicBool,
    rejected_writes: AtomicUsize,
}

impl FailingStore {
    /// Writes to keys starting with `prefix` fail until [`heal`](Self::heal)
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: MemoryKvStore::new(),
            prefix: prefix.into(),
            failing: AtomicBool::new(true),
            rejected_writes: AtomicUsize::new(0),
        }
    }

    /// Let writes through again
    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Writes refused so far
    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }
}

#[async_trait]
impl KvStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) && key.starts_with(&self.prefix) {
            self.rejected_writes.fetch_add(1, Ordering::SeqCst);
            return Err(BatchError::storage(format!("injected write failure for {}", key)));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_prefix(prefix).await
    }
}
