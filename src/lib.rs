//! # Resumable Batch
//!
//! Orchestrates large batches of calls against rate-limited remote APIs.
//! Every item's progress is checkpointed, so a crashed or cancelled run
//! picks up where it stopped without paying for work already done.
//!
//! ## Features
//!
//! - **Request Fingerprinting**: Identical `(operation, params)` pairs share one cache entry
//! - **Response Cache**: TTL-bounded, per-operation lifetimes, shared across runs
//! - **Rate Limiting**: Sliding window budget plus a concurrency cap per endpoint class
//! - **Retries**: Exponential backoff with jitter, honoring server retry hints
//! - **Checkpoints**: Per-item state machine persisted before every transition
//! - **Cancellation**: Stops new dispatches and leaves the run resumable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resumable_batch::{EngineConfig, Orchestrator, RemoteError, WorkItem, remote_fn};
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_file("config/engine.yaml").await?;
//!     let orchestrator = Orchestrator::from_config(config).await?;
//!
//!     let items = vec![
//!         WorkItem::new("kw-1", "keyword_metrics").with_param("keyword", json!("running shoes")),
//!         WorkItem::new("kw-2", "keyword_metrics").with_param("keyword", json!("trail shoes")),
//!     ];
//!     let call = remote_fn(|item: WorkItem| async move {
//!         Ok::<_, RemoteError>(json!({ "keyword": item.params()["keyword"], "volume": 1000 }))
//!     });
//!
//!     let result = orchestrator
//!         .run("keywords-2024-06", items, &call, &CancellationToken::new())
//!         .await?;
//!     println!("{} succeeded, {} failed", result.succeeded.len(), result.failed.len());
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{
    CacheConfig, EngineConfig, LoggingConfig, OrchestratorConfig, RateLimitConfig, RetryConfig,
    StorageBackend, StorageConfig,
};
pub use core::batch::{
    BatchResult, FailedItem, Orchestrator, OrchestratorBuilder, RemoteCall, RemoteFn, RunStats,
    RunStatus, WorkItem, remote_fn,
};
pub use core::cache_manager::{CacheEntry, CacheStats, CacheStore};
pub use core::checkpoint::{
    AttemptRecord, CheckpointStore, ItemRecord, ItemState, RunCheckpoint, RunSummary,
};
pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::fingerprint::{Fingerprint, compute_fingerprint};
pub use core::rate_limiter::{RateLimitPermit, RateLimitStatus, RateLimiter};
pub use core::retry::{ErrorClass, GiveUpReason, RetryDecision, RetryPolicy};
pub use storage::{FileKvStore, KvStore, MemoryKvStore, open_store};
#[cfg(feature = "redis")]
pub use storage::RedisKvStore;
pub use utils::error::{BatchError, RemoteError, RemoteErrorKind, Result};
pub use utils::logging::init_tracing;

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
