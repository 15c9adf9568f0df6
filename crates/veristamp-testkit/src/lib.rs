//! # Veristamp Testkit
//!
//! Shared fixtures and proptest generators for testing against the
//! verification ledger without a live chain.

pub mod fixtures;
pub mod generators;

pub use fixtures::{init_test_tracing, TestHarness};
