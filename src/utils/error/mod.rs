//! Error Handling utilities
//!
//! This module provides the engine's error taxonomy.

pub mod error;

// Re-export commonly used types
pub use error::*;
