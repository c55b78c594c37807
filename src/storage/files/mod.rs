//! File storage implementation
//!
//! This module provides the file-tree key-value backend.

mod local;

// Re-export public types
pub use local::FileKvStore;
