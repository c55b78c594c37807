//! Integration tests for resumable-batch
//!
//! These tests drive full runs through the public API with real stores and
//! scripted remote calls.

pub mod config_tests;
pub mod file_store_tests;
pub mod orchestrator_tests;
pub mod rate_limit_tests;
