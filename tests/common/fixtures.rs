//! Test fixtures and data factories
//!
//! Provides factory methods for creating work items, configurations and
//! orchestrators with sensible defaults. Remote calls are scripted closures,
//! everything else is the real implementation.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use resumable_batch::{
    EngineConfig, KvStore, ManualClock, MemoryKvStore, Orchestrator, RateLimitConfig, RemoteCall,
    RemoteError, RetryConfig, WorkItem,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Engine configuration with a generous default rate limit and a fast,
/// jitter-free retry policy
pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .with_default_rate_limit(RateLimitConfig::new(10_000, Duration::from_secs(60), 8))
        .with_retry(RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            jitter: 0.0,
        })
}

/// Factory for creating work items
pub struct ItemFactory;

impl ItemFactory {
    /// A keyword lookup; items with the same keyword share a fingerprint
    pub fn keyword(id: &str, keyword: &str) -> WorkItem {
        WorkItem::new(id, "keyword_metrics")
            .with_param("keyword", json!(keyword))
            .with_param("location", json!(2840))
    }

    /// `count` items with distinct keywords, ids `item-00`, `item-01`, ...
    pub fn distinct(count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| Self::keyword(&format!("item-{:02}", i), &format!("keyword {}", i)))
            .collect()
    }

    /// A page scrape charged against the `firecrawl` budget
    pub fn scrape(id: &str, url: &str) -> WorkItem {
        WorkItem::new(id, "scrape")
            .with_param("url", json!(url))
            .with_endpoint_class("firecrawl")
    }
}

type Responder = dyn Fn(&WorkItem, usize) -> Result<Value, RemoteError> + Send + Sync;

/// Remote call driven by a closure
///
/// The closure gets the item and the zero-based number of earlier calls for
/// that item id. Calls are counted in total and per item, and the highest
/// number of simultaneous calls is remembered.
pub struct ScriptedCall {
    responder: Box<Responder>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    per_item: DashMap<String, usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedCall {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&WorkItem, usize) -> Result<Value, RemoteError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: None,
            calls: AtomicUsize::new(0),
            per_item: DashMap::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Always succeeds with the item's params
    pub fn echo() -> Self {
        Self::new(|item, _| Ok(json!({ "id": item.id(), "params": item.params() })))
    }

    /// Hold every call for `latency` of tokio time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total calls made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls made with `item_id` as the dispatched item
    pub fn calls_for(&self, item_id: &str) -> usize {
        self.per_item.get(item_id).map(|n| *n).unwrap_or(0)
    }

    /// Highest number of overlapping calls
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCall for ScriptedCall {
    async fn call(&self, item: &WorkItem) -> Result<Value, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let previous = {
            let mut count = self.per_item.entry(item.id().to_string()).or_insert(0);
            let previous = *count;
            *count += 1;
            previous
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(item, previous)
    }
}

/// An orchestrator wired to a shared backend and a manual clock
pub struct TestEngine {
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn KvStore>,
    pub clock: ManualClock,
}

impl TestEngine {
    /// In-memory engine using [`test_config`]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryKvStore::new()))
    }

    pub fn with_store(config: EngineConfig, store: Arc<dyn KvStore>) -> Self {
        let clock = ManualClock::new(Utc::now());
        let orchestrator = Orchestrator::builder()
            .config(config)
            .store(store.clone())
            .clock(Arc::new(clock.clone()))
            .build()
            .expect("valid test configuration");
        Self {
            orchestrator,
            store,
            clock,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
