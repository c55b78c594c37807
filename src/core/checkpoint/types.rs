//! Checkpoint record types

use crate::core::fingerprint::Fingerprint;
use crate::core::retry::ErrorClass;
use crate::utils::error::RemoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of one work item within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl ItemState {
    /// Succeeded and Failed never transition again within a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Attempt bookkeeping for one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Attempts dispatched so far
    pub attempts: u32,
    /// Error from the most recent failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RemoteError>,
    /// Classification of `last_error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_class: Option<ErrorClass>,
    /// Earliest time the next attempt may start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_eligible_at: Option<DateTime<Utc>>,
}

/// Durable per-item checkpoint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub state: ItemState,
    #[serde(default)]
    pub attempt: AttemptRecord,
    pub fingerprint: Fingerprint,
    /// Response for Succeeded items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Fresh record for an item that has not been dispatched yet
    pub fn pending(item_id: impl Into<String>, fingerprint: Fingerprint, now: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            state: ItemState::Pending,
            attempt: AttemptRecord::default(),
            fingerprint,
            response: None,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Run metadata stored next to the item records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RunMeta {
    pub(crate) run_key: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Everything recorded for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub run_key: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: BTreeMap<String, ItemRecord>,
}

impl RunCheckpoint {
    /// Checkpoint for a run nothing is known about
    pub fn empty(run_key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            run_key: run_key.into(),
            started_at: now,
            updated_at: now,
            items: BTreeMap::new(),
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemRecord> {
        self.items.get(item_id)
    }

    /// True iff every known item is terminal
    pub fn is_complete(&self) -> bool {
        self.items.values().all(ItemRecord::is_terminal)
    }

    /// Count items by state
    pub fn count(&self, state: ItemState) -> usize {
        self.items.values().filter(|r| r.state == state).count()
    }

    /// Progress summary
    pub fn summary(&self) -> RunSummary {
        let total = self.items.len();
        let succeeded = self.count(ItemState::Succeeded);
        let failed = self.count(ItemState::Failed);
        let pending = total - succeeded - failed;

        RunSummary {
            run_key: self.run_key.clone(),
            started_at: self.started_at,
            updated_at: self.updated_at,
            total,
            succeeded,
            failed,
            pending,
            percentage: if total == 0 {
                100.0
            } else {
                (succeeded + failed) as f64 * 100.0 / total as f64
            },
        }
    }
}

/// Progress of a run, as reported by run listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_key: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Pending or interrupted in flight
    pub pending: usize,
    /// Share of items that reached a terminal state
    pub percentage: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} done ({:.1}%), {} succeeded, {} failed, {} pending",
            self.run_key,
            self.succeeded + self.failed,
            self.total,
            self.percentage,
            self.succeeded,
            self.failed,
            self.pending
        )
    }
}
