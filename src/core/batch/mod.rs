//! Batch orchestration
//!
//! Turns a list of work items into cached, rate-limited, retried and
//! checkpointed remote calls. A run can be interrupted at any point and
//! resumed by calling [`Orchestrator::run`] again with the same run key.

mod execution;
mod orchestrator;
mod progress;
mod types;


pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use types::{
    BatchResult, FailedItem, RemoteCall, RemoteFn, RunStats, RunStatus, WorkItem, remote_fn,
};
