//! Shared helpers.
//!
//! Stateless utilities used across the crate and its binaries.

pub mod bootstrap;
pub mod retry;
