//! Error handling for the batch engine
//!
//! This module defines all error types used throughout the engine.

#![allow(missing_docs)]

mod helpers;
mod remote;
mod types;

pub use remote::{RemoteError, RemoteErrorKind};
pub use types::{BatchError, Result};
