//! Integration test suite for credo
//!
//! End-to-end tests of the module pipeline (through the `test-utils` mocks) and
//! of the `credo` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `credo` binary: init, dispatch errors, url commits, list
//! - **pipeline**: Resolve, commit, save and apply across modules
//! - **cache_persistence**: Durable cache reuse across runs

mod common;

mod cache_persistence;
mod cli;
mod pipeline;
