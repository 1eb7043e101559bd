//! Batch integration tests.
//!
//! Runs the orchestrator end to end against the in-process substrate.
//! Run with: cargo test --test batch_integration

mod common;
mod concurrency;
mod idempotency;
mod script;
