//! Batch types: work items, the remote call seam and run results

use crate::core::fingerprint::{Fingerprint, compute_fingerprint};
use crate::core::retry::ErrorClass;
use crate::utils::error::{BatchError, RemoteError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

/// One unit of remote work
///
/// Built once through the consuming `with_*` methods and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    id: String,
    operation: String,
    endpoint_class: String,
    params: BTreeMap<String, Value>,
    payload: Value,
}

impl WorkItem {
    /// Create an item; the endpoint class defaults to the operation name
    pub fn new(id: impl Into<String>, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        Self {
            id: id.into(),
            endpoint_class: operation.clone(),
            operation,
            params: BTreeMap::new(),
            payload: Value::Null,
        }
    }

    /// Add a semantic parameter
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Add several semantic parameters
    pub fn with_params<I, K>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Attach application data for building the call
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Charge the call against a different rate-limit budget
    pub fn with_endpoint_class(mut self, endpoint_class: impl Into<String>) -> Self {
        self.endpoint_class = endpoint_class.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn endpoint_class(&self) -> &str {
        &self.endpoint_class
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Fingerprint of `(operation, params)`; the payload does not take part
    pub fn fingerprint(&self) -> Fingerprint {
        compute_fingerprint(&self.operation, &self.params)
    }
}

/// Caller-supplied remote call
///
/// The orchestrator treats the call as opaque and only inspects the error
/// to decide whether to retry.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(&self, item: &WorkItem) -> std::result::Result<Value, RemoteError>;
}

/// [`RemoteCall`] backed by an async closure, see [`remote_fn`]
#[derive(Clone)]
pub struct RemoteFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for RemoteFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFn").finish_non_exhaustive()
    }
}

/// Adapt an async closure into a [`RemoteCall`]
///
/// ```rust,no_run
/// use resumable_batch::{RemoteError, WorkItem, remote_fn};
/// use serde_json::json;
///
/// let call = remote_fn(|item: WorkItem| async move {
///     Ok::<_, RemoteError>(json!({ "echo": item.id() }))
/// });
/// ```
pub fn remote_fn<F, Fut>(f: F) -> RemoteFn<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, RemoteError>> + Send + 'static,
{
    RemoteFn { f }
}

#[async_trait]
impl<F, Fut> RemoteCall for RemoteFn<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, RemoteError>> + Send + 'static,
{
    async fn call(&self, item: &WorkItem) -> std::result::Result<Value, RemoteError> {
        (self.f)(item.clone()).await
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every submitted item is terminal
    Completed,
    /// Cancellation stopped the run with items still pending
    Cancelled,
}

/// Manifest entry for an item that ended Failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Last error seen
    pub error: RemoteError,
    /// Classification of `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,
    /// Attempts dispatched
    pub attempts: u32,
}

impl FailedItem {
    /// The failure as a [`BatchError`]; exhausted retryable failures are
    /// transient, everything else permanent
    pub fn to_error(&self) -> BatchError {
        match self.class {
            Some(ErrorClass::Retryable) => BatchError::TransientRemote(self.error.clone()),
            _ => BatchError::PermanentRemote(self.error.clone()),
        }
    }
}

/// Counters for one `run` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Distinct items submitted
    pub submitted: usize,
    /// Items already terminal in the checkpoint
    pub already_terminal: usize,
    /// Items sharing a fingerprint with an earlier item
    pub deduplicated: usize,
    /// Remote calls issued
    pub remote_calls: u64,
    /// Fingerprint groups answered from the cache
    pub cache_hits: u64,
    /// Retries scheduled after retryable failures
    pub retries: u64,
    /// Wall time of the call
    pub elapsed: Duration,
}

/// Aggregate result of a run
///
/// Built from the checkpoint after the workers stop, so a repeated run over
/// the same key reports the same outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub run_key: String,
    pub status: RunStatus,
    /// Responses by item id
    pub succeeded: BTreeMap<String, Value>,
    /// Failure manifest by item id
    pub failed: BTreeMap<String, FailedItem>,
    /// Items still Pending, sorted
    pub pending: Vec<String>,
    pub stats: RunStats,
}

impl BatchResult {
    /// Result of a run with nothing to do
    pub fn empty(run_key: impl Into<String>) -> Self {
        Self {
            run_key: run_key.into(),
            status: RunStatus::Completed,
            succeeded: BTreeMap::new(),
            failed: BTreeMap::new(),
            pending: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Whether every submitted item reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Whether at least one item failed
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of items in the result
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.pending.len()
    }

    /// Same items in the same states with the same responses, ignoring stats
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.run_key == other.run_key
            && self.status == other.status
            && self.succeeded == other.succeeded
            && self.failed == other.failed
            && self.pending == other.pending
    }

    /// Turn a cancelled result into [`BatchError::RunAborted`]
    pub fn into_completed(self) -> Result<Self> {
        match self.status {
            RunStatus::Completed => Ok(self),
            RunStatus::Cancelled => Err(BatchError::run_aborted(self.run_key, self.pending.len())),
        }
    }
}
