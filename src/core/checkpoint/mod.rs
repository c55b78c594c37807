//! Checkpoint store
//!
//! Durable record of every work item's state, keyed by run. A run can be
//! interrupted at any point and resumed from whatever was written here.

mod store;
mod types;


pub use store::CheckpointStore;
pub use types::{AttemptRecord, ItemRecord, ItemState, RunCheckpoint, RunSummary};
