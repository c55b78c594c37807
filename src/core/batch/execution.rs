//! Run execution
//!
//! Each fingerprint group runs its own sequential state machine:
//!
//! ```text
//! Pending --dispatch--> InFlight --ok--------------------------> Succeeded
//!                          |------retryable, budget left--> Pending (backoff)
//!                          '------non-retryable/exhausted--> Failed
//! ```
//!
//! Every transition is written to the checkpoint before the worker acts on
//! it, so an interrupted run resumes from the last durable state.

use super::orchestrator::Orchestrator;
use super::progress::ProgressTracker;
use super::types::{BatchResult, FailedItem, RemoteCall, RunStats, RunStatus, WorkItem};
use crate::core::checkpoint::{AttemptRecord, ItemRecord, ItemState, RunCheckpoint};
use crate::core::clock::advance_by;
use crate::core::fingerprint::Fingerprint;
use crate::core::retry::RetryDecision;
use crate::utils::error::{BatchError, RemoteError, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Items sharing one fingerprint; one remote dispatch serves them all
#[derive(Debug)]
struct DispatchGroup {
    fingerprint: Fingerprint,
    /// First member in submission order; its payload builds the call
    leader: WorkItem,
    member_ids: Vec<String>,
    attempt: AttemptRecord,
}

#[derive(Debug, Default)]
struct RunCounters {
    remote_calls: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
}

/// State shared by the workers of one run
struct RunContext<'a, C: ?Sized> {
    run_key: &'a str,
    call: &'a C,
    cancel: &'a CancellationToken,
    progress: ProgressTracker,
    counters: RunCounters,
}

impl Orchestrator {
    /// Process `items` under `run_key` until every item is terminal or
    /// `cancel` fires
    ///
    /// Items already terminal in the checkpoint are not dispatched again.
    /// Per-item failures end up in [`BatchResult::failed`]; only an
    /// unavailable checkpoint or invalid input make this return an error.
    /// Cancellation stops new dispatches, lets calls in flight finish and
    /// returns a result with status [`RunStatus::Cancelled`].
    pub async fn run<C>(
        &self,
        run_key: &str,
        items: Vec<WorkItem>,
        call: &C,
        cancel: &CancellationToken,
    ) -> Result<BatchResult>
    where
        C: RemoteCall + ?Sized,
    {
        let started = Instant::now();
        let items = self.prepare(run_key, items)?;
        if items.is_empty() {
            info!(run_key = %run_key, "Empty batch, nothing to do");
            return Ok(BatchResult::empty(run_key));
        }

        let checkpoint = self.checkpoints.register(run_key, &items).await?;
        let (groups, already_terminal) = Self::plan(&items, &checkpoint);
        let to_process: usize = groups.iter().map(|g| g.member_ids.len()).sum();

        info!(
            run_key = %run_key,
            submitted = items.len(),
            already_terminal,
            to_process,
            dispatch_groups = groups.len(),
            "Starting batch run"
        );

        let ctx = RunContext {
            run_key,
            call,
            cancel,
            progress: ProgressTracker::new(
                run_key,
                items.len(),
                already_terminal,
                self.config.progress_log_interval,
            ),
            counters: RunCounters::default(),
        };

        let deduplicated = to_process - groups.len();
        let mut workers = stream::iter(groups)
            .map(|group| self.process_group(&ctx, group))
            .buffer_unordered(self.config.max_workers.max(1));

        while let Some(outcome) = workers.next().await {
            if let Err(e) = outcome {
                error!(run_key = %run_key, error = %e, "Aborting run");
                return Err(e);
            }
        }
        drop(workers);

        let checkpoint = self.checkpoints.load(run_key).await?;
        let stats = RunStats {
            submitted: items.len(),
            already_terminal,
            deduplicated,
            remote_calls: ctx.counters.remote_calls.load(Ordering::Relaxed),
            cache_hits: ctx.counters.cache_hits.load(Ordering::Relaxed),
            retries: ctx.counters.retries.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };
        let result = Self::collect(run_key, &items, &checkpoint, stats);

        if result.status == RunStatus::Cancelled && !cancel.is_cancelled() {
            warn!(run_key = %run_key, pending = result.pending.len(), "Run ended with pending items");
        }
        info!(
            run_key = %run_key,
            status = ?result.status,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            pending = result.pending.len(),
            remote_calls = result.stats.remote_calls,
            cache_hits = result.stats.cache_hits,
            elapsed_ms = result.stats.elapsed.as_millis() as u64,
            "Batch run finished"
        );
        Ok(result)
    }

    /// Validate input and drop repeated ids
    fn prepare(&self, run_key: &str, items: Vec<WorkItem>) -> Result<Vec<WorkItem>> {
        if run_key.is_empty() {
            return Err(BatchError::config("run key must not be empty"));
        }

        let mut seen = HashSet::with_capacity(items.len());
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            if item.id().is_empty() {
                return Err(BatchError::config(format!(
                    "work item for operation '{}' has an empty id",
                    item.operation()
                )));
            }
            if !self.limiter.has_limit(item.endpoint_class()) {
                return Err(BatchError::config(format!(
                    "no rate limit configured for endpoint class '{}'",
                    item.endpoint_class()
                )));
            }
            if !seen.insert(item.id().to_string()) {
                warn!(run_key = %run_key, item_id = %item.id(), "Duplicate item id, keeping the first occurrence");
                continue;
            }
            unique.push(item);
        }

        Ok(unique)
    }

    /// Split non-terminal items into fingerprint groups; returns the groups
    /// and the number of items that were already terminal
    fn plan(items: &[WorkItem], checkpoint: &RunCheckpoint) -> (Vec<DispatchGroup>, usize) {
        let mut groups: Vec<DispatchGroup> = Vec::new();
        let mut index: HashMap<Fingerprint, usize> = HashMap::new();
        let mut already_terminal = 0;

        for item in items {
            let record = checkpoint.get(item.id());
            if record.is_some_and(ItemRecord::is_terminal) {
                already_terminal += 1;
                continue;
            }

            let attempt = record.map(|r| r.attempt.clone()).unwrap_or_default();
            let fingerprint = item.fingerprint();

            match index.get(&fingerprint) {
                Some(&i) => {
                    let group = &mut groups[i];
                    group.member_ids.push(item.id().to_string());
                    // The group carries the most advanced attempt history
                    if attempt.attempts > group.attempt.attempts {
                        group.attempt = attempt;
                    }
                }
                None => {
                    index.insert(fingerprint.clone(), groups.len());
                    groups.push(DispatchGroup {
                        fingerprint,
                        leader: item.clone(),
                        member_ids: vec![item.id().to_string()],
                        attempt,
                    });
                }
            }
        }

        (groups, already_terminal)
    }

    async fn process_group<C>(&self, ctx: &RunContext<'_, C>, group: DispatchGroup) -> Result<()>
    where
        C: RemoteCall + ?Sized,
    {
        let DispatchGroup {
            fingerprint,
            leader,
            member_ids,
            mut attempt,
        } = group;
        let run_key = ctx.run_key;

        if ctx.cancel.is_cancelled() {
            return Ok(());
        }

        if let Some(entry) = self.cache.get(&fingerprint).await {
            ctx.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                run_key = %run_key,
                item_id = %leader.id(),
                fingerprint = %fingerprint.short(),
                members = member_ids.len(),
                "Served from cache"
            );
            self.record_members(
                run_key,
                &member_ids,
                &fingerprint,
                ItemState::Succeeded,
                &attempt,
                Some(&entry.response),
            )
            .await?;
            ctx.progress.advance(member_ids.len());
            return Ok(());
        }

        loop {
            // Backoff scheduled by an earlier, interrupted run
            if let Some(eligible_at) = attempt.next_eligible_at.take() {
                if let Ok(wait) = eligible_at.signed_duration_since(self.clock.now()).to_std() {
                    if !wait.is_zero() && !self.sleep_unless_cancelled(wait, ctx.cancel).await {
                        return Ok(());
                    }
                }
            }

            if attempt.attempts >= self.retry.max_attempts() {
                // Budget spent under an earlier, more generous configuration
                let error = attempt
                    .last_error
                    .clone()
                    .unwrap_or_else(|| RemoteError::other("attempt budget exhausted"));
                warn!(run_key = %run_key, item_id = %leader.id(), attempts = attempt.attempts, "Item failed: {}", error);
                attempt.last_error = Some(error);
                self.record_members(run_key, &member_ids, &fingerprint, ItemState::Failed, &attempt, None)
                    .await?;
                ctx.progress.advance(member_ids.len());
                return Ok(());
            }

            let permit = match self.limiter.acquire(leader.endpoint_class(), ctx.cancel).await {
                Ok(permit) => permit,
                Err(BatchError::Cancelled(_)) => return Ok(()),
                Err(e) => return Err(e),
            };

            attempt.attempts += 1;
            self.record_members(run_key, &member_ids, &fingerprint, ItemState::InFlight, &attempt, None)
                .await?;

            ctx.counters.remote_calls.fetch_add(1, Ordering::Relaxed);
            debug!(
                run_key = %run_key,
                item_id = %leader.id(),
                fingerprint = %fingerprint.short(),
                endpoint_class = %leader.endpoint_class(),
                attempt = attempt.attempts,
                "Dispatching remote call"
            );
            let outcome = ctx.call.call(&leader).await;
            self.limiter.release(permit);

            let error = match outcome {
                Ok(response) => {
                    self.cache
                        .put(
                            &fingerprint,
                            leader.operation(),
                            &response,
                            self.cache.ttl_for(leader.operation()),
                        )
                        .await;
                    self.record_members(
                        run_key,
                        &member_ids,
                        &fingerprint,
                        ItemState::Succeeded,
                        &attempt,
                        Some(&response),
                    )
                    .await?;
                    ctx.progress.advance(member_ids.len());
                    return Ok(());
                }
                Err(error) => error,
            };

            attempt.last_class = Some(self.retry.classify(&error));
            match self.retry.decide(attempt.attempts, &error) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        run_key = %run_key,
                        item_id = %leader.id(),
                        attempt = attempt.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retryable failure, backing off"
                    );
                    attempt.last_error = Some(error);
                    attempt.next_eligible_at = Some(advance_by(self.clock.now(), delay));
                    self.record_members(run_key, &member_ids, &fingerprint, ItemState::Pending, &attempt, None)
                        .await?;
                    ctx.counters.retries.fetch_add(1, Ordering::Relaxed);

                    if !self.sleep_unless_cancelled(delay, ctx.cancel).await {
                        return Ok(());
                    }
                    attempt.next_eligible_at = None;
                }
                RetryDecision::GiveUp(reason) => {
                    warn!(
                        run_key = %run_key,
                        item_id = %leader.id(),
                        attempts = attempt.attempts,
                        error = %error,
                        "Item failed: {}",
                        reason
                    );
                    attempt.last_error = Some(error);
                    self.record_members(run_key, &member_ids, &fingerprint, ItemState::Failed, &attempt, None)
                        .await?;
                    ctx.progress.advance(member_ids.len());
                    return Ok(());
                }
            }
        }
    }

    /// Apply one transition to every member of a group
    async fn record_members(
        &self,
        run_key: &str,
        member_ids: &[String],
        fingerprint: &Fingerprint,
        state: ItemState,
        attempt: &AttemptRecord,
        response: Option<&Value>,
    ) -> Result<()> {
        let now = self.clock.now();
        for item_id in member_ids {
            let record = ItemRecord {
                item_id: item_id.clone(),
                state,
                attempt: attempt.clone(),
                fingerprint: fingerprint.clone(),
                response: response.cloned(),
                updated_at: now,
            };
            self.checkpoints.record_transition(run_key, &record).await?;
        }
        Ok(())
    }

    /// Sleep through the clock; false if cancelled first
    async fn sleep_unless_cancelled(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.clock.sleep(delay) => true,
        }
    }

    /// Build the result for the submitted items from a fresh checkpoint load
    fn collect(
        run_key: &str,
        items: &[WorkItem],
        checkpoint: &RunCheckpoint,
        stats: RunStats,
    ) -> BatchResult {
        let mut succeeded = BTreeMap::new();
        let mut failed = BTreeMap::new();
        let mut pending = Vec::new();

        for item in items {
            let id = item.id().to_string();
            match checkpoint.get(item.id()) {
                Some(record) if record.state == ItemState::Succeeded => {
                    succeeded.insert(id, record.response.clone().unwrap_or(Value::Null));
                }
                Some(record) if record.state == ItemState::Failed => {
                    let error = record
                        .attempt
                        .last_error
                        .clone()
                        .unwrap_or_else(|| RemoteError::other("no error recorded"));
                    failed.insert(
                        id,
                        FailedItem {
                            error,
                            class: record.attempt.last_class,
                            attempts: record.attempt.attempts,
                        },
                    );
                }
                _ => pending.push(id),
            }
        }
        pending.sort();

        BatchResult {
            run_key: run_key.to_string(),
            status: if pending.is_empty() {
                RunStatus::Completed
            } else {
                RunStatus::Cancelled
            },
            succeeded,
            failed,
            pending,
            stats,
        }
    }
}
