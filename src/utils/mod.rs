//! Utility modules for the engine
//!
//! - **error**: Error types and remote failure descriptions
//! - **logging**: Tracing subscriber setup

pub mod error;
pub mod logging;
