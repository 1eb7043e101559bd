//! Fanout - Bounded-concurrency batch dispatch
//!
//! Fans a batch of independent units out over a durable execution substrate,
//! keeping a fixed number of dispatches outstanding and aggregating every
//! outcome into one ordered result.

pub mod config;
pub mod orchestration;
pub mod substrate;
pub mod unit;
pub mod utils;
