//! Orchestration layer for bounded-concurrency batch dispatch.
//!
//! - `budget`: counting permit pool capping outstanding dispatches
//! - `selector`: wait-for-first-of-many over outstanding dispatches
//! - `batch`: the dispatch loop and its result accumulator

pub mod batch;
pub mod budget;
pub mod selector;

pub use batch::{BatchOptions, BatchOrchestrator, BatchResult, OrchestrationError};
pub use budget::{ConcurrencyBudget, Permit};
pub use selector::Selector;
