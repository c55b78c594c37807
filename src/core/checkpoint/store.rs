//! Durable checkpoint store
//!
//! Layout inside the key-value backend:
//!
//! ```text
//! checkpoint/{run}/meta           run start and last update
//! checkpoint/{run}/items/{item}   one ItemRecord per work item
//! ```
//!
//! `{run}` is the run key with `%` and `/` percent-encoded so run keys cannot
//! collide with the item namespace. Each item lives under its own key, so
//! concurrent workers never write the same record.

use super::types::{ItemRecord, ItemState, RunCheckpoint, RunMeta, RunSummary};
use crate::core::batch::WorkItem;
use crate::core::clock::{Clock, SystemClock};
use crate::storage::KvStore;
use crate::utils::error::{BatchError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const CHECKPOINT_PREFIX: &str = "checkpoint/";
const META_SUFFIX: &str = "/meta";
const RUN_LEVEL_ID: &str = "<run>";

/// Per-item, write-before-continue checkpoint store
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    /// Tries per backend operation before giving up
    write_attempts: u32,
    /// Pause between tries
    retry_delay: Duration,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            write_attempts: 3,
            retry_delay: Duration::from_millis(50),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set how often a failing backend operation is tried
    pub fn with_write_policy(mut self, attempts: u32, retry_delay: Duration) -> Self {
        self.write_attempts = attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts
    }

    fn encode_run_key(run_key: &str) -> String {
        run_key.replace('%', "%25").replace('/', "%2F")
    }

    fn decode_run_key(encoded: &str) -> String {
        encoded.replace("%2F", "/").replace("%25", "%")
    }

    fn meta_key(run_key: &str) -> String {
        format!(
            "{}{}{}",
            CHECKPOINT_PREFIX,
            Self::encode_run_key(run_key),
            META_SUFFIX
        )
    }

    fn items_prefix(run_key: &str) -> String {
        format!("{}{}/items/", CHECKPOINT_PREFIX, Self::encode_run_key(run_key))
    }

    fn item_key(run_key: &str, item_id: &str) -> String {
        format!("{}{}", Self::items_prefix(run_key), item_id)
    }

    /// Run `op` until it succeeds or the attempt budget is spent, then report
    /// the checkpoint as unavailable
    async fn with_retries<T, F, Fut>(&self, run_key: &str, item_id: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.write_attempts => {
                    warn!(
                        run_key = %run_key,
                        item_id = %item_id,
                        attempt,
                        error = %e,
                        "Checkpoint storage operation failed, retrying"
                    );
                    attempt += 1;
                    self.clock.sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        run_key = %run_key,
                        item_id = %item_id,
                        attempts = attempt,
                        error = %e,
                        "Checkpoint storage unavailable"
                    );
                    return Err(BatchError::checkpoint_unavailable(
                        run_key,
                        item_id,
                        e.to_string(),
                    ));
                }
            }
        }
    }

    async fn read_meta(&self, run_key: &str) -> Result<Option<RunMeta>> {
        let key = Self::meta_key(run_key);
        let bytes = self
            .with_retries(run_key, RUN_LEVEL_ID, || self.store.get(&key))
            .await?;

        Ok(match bytes {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!(run_key = %run_key, error = %e, "Ignoring unreadable run metadata");
                    None
                }
            },
            None => None,
        })
    }

    async fn write_meta(&self, meta: &RunMeta) -> Result<()> {
        let key = Self::meta_key(&meta.run_key);
        let bytes = serde_json::to_vec(meta)?;
        self.with_retries(&meta.run_key, RUN_LEVEL_ID, || {
            self.store.put(&key, bytes.clone())
        })
        .await
    }

    /// Load a run's checkpoint; unknown runs yield an empty checkpoint
    ///
    /// Records left InFlight by an interrupted process come back as Pending
    /// with the unobserved attempt refunded.
    pub async fn load(&self, run_key: &str) -> Result<RunCheckpoint> {
        let now = self.clock.now();
        let mut checkpoint = match self.read_meta(run_key).await? {
            Some(meta) => RunCheckpoint {
                run_key: run_key.to_string(),
                started_at: meta.started_at,
                updated_at: meta.updated_at,
                items: Default::default(),
            },
            None => RunCheckpoint::empty(run_key, now),
        };

        let prefix = Self::items_prefix(run_key);
        let keys = self
            .with_retries(run_key, RUN_LEVEL_ID, || self.store.list_prefix(&prefix))
            .await?;

        for key in keys {
            let item_id = key.strip_prefix(&prefix).unwrap_or(&key);
            let Some(bytes) = self
                .with_retries(run_key, item_id, || self.store.get(&key))
                .await?
            else {
                continue;
            };

            let mut record: ItemRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(e) => {
                    warn!(run_key = %run_key, item_id = %item_id, error = %e, "Ignoring unreadable checkpoint record");
                    continue;
                }
            };

            if record.state == ItemState::InFlight {
                debug!(
                    run_key = %run_key,
                    item_id = %record.item_id,
                    attempts = record.attempt.attempts,
                    "Item was interrupted in flight, requeueing"
                );
                record.state = ItemState::Pending;
                record.attempt.attempts = record.attempt.attempts.saturating_sub(1);
            }

            if record.updated_at > checkpoint.updated_at {
                checkpoint.updated_at = record.updated_at;
            }
            checkpoint.items.insert(record.item_id.clone(), record);
        }

        Ok(checkpoint)
    }

    /// Record every item not yet known as Pending, then return the checkpoint
    ///
    /// Items already in the checkpoint keep their recorded state.
    pub async fn register(&self, run_key: &str, items: &[WorkItem]) -> Result<RunCheckpoint> {
        let mut checkpoint = self.load(run_key).await?;
        let now = self.clock.now();

        self.write_meta(&RunMeta {
            run_key: run_key.to_string(),
            started_at: checkpoint.started_at,
            updated_at: now,
        })
        .await?;

        let mut added = 0usize;
        for item in items {
            let fingerprint = item.fingerprint();
            if let Some(existing) = checkpoint.items.get(item.id()) {
                if existing.fingerprint != fingerprint {
                    warn!(
                        run_key = %run_key,
                        item_id = %item.id(),
                        "Item parameters changed since it was first recorded; keeping recorded state"
                    );
                }
                continue;
            }

            let record = ItemRecord::pending(item.id(), fingerprint, now);
            self.record_transition(run_key, &record).await?;
            checkpoint.items.insert(record.item_id.clone(), record);
            added += 1;
        }

        checkpoint.updated_at = now;
        info!(
            run_key = %run_key,
            added,
            known = checkpoint.items.len() - added,
            "Registered run items"
        );
        Ok(checkpoint)
    }

    /// Durably persist one item's record
    pub async fn record_transition(&self, run_key: &str, record: &ItemRecord) -> Result<()> {
        let key = Self::item_key(run_key, &record.item_id);
        let bytes = serde_json::to_vec(record)?;

        self.with_retries(run_key, &record.item_id, || {
            self.store.put(&key, bytes.clone())
        })
        .await?;

        debug!(
            run_key = %run_key,
            item_id = %record.item_id,
            state = %record.state,
            attempts = record.attempt.attempts,
            "Recorded transition"
        );
        Ok(())
    }

    /// True iff every known item of the run is terminal
    pub async fn is_complete(&self, run_key: &str) -> Result<bool> {
        Ok(self.load(run_key).await?.is_complete())
    }

    /// Progress summary for one run
    pub async fn progress(&self, run_key: &str) -> Result<RunSummary> {
        Ok(self.load(run_key).await?.summary())
    }

    /// Every run with a checkpoint, most recently updated first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let keys = self
            .with_retries("*", RUN_LEVEL_ID, || self.store.list_prefix(CHECKPOINT_PREFIX))
            .await?;

        let mut runs = Vec::new();
        for key in keys {
            let Some(encoded) = key
                .strip_prefix(CHECKPOINT_PREFIX)
                .and_then(|rest| rest.strip_suffix(META_SUFFIX))
            else {
                continue;
            };
            // Item ids may end in "/meta"; real run keys are encoded without '/'
            if encoded.contains('/') {
                continue;
            }

            let run_key = Self::decode_run_key(encoded);
            runs.push(self.load(&run_key).await?.summary());
        }

        runs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(runs)
    }

    /// Delete a run's checkpoint, returning the number of item records removed
    pub async fn clear(&self, run_key: &str) -> Result<usize> {
        let prefix = Self::items_prefix(run_key);
        let keys = self
            .with_retries(run_key, RUN_LEVEL_ID, || self.store.list_prefix(&prefix))
            .await?;

        for key in &keys {
            self.with_retries(run_key, RUN_LEVEL_ID, || self.store.delete(key))
                .await?;
        }

        let meta_key = Self::meta_key(run_key);
        self.with_retries(run_key, RUN_LEVEL_ID, || self.store.delete(&meta_key))
            .await?;

        info!(run_key = %run_key, removed = keys.len(), "Cleared checkpoint");
        Ok(keys.len())
    }
}
