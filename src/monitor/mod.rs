//! Monitoring orchestrator.
//!
//! - `core`: Monitor struct and construction
//! - `tasks`: testable `*_once` steps and the spawned loops
//! - `tests`: unit tests for the tick logic

pub mod core;
pub mod tasks;

pub use core::{Collaborators, Monitor};
pub use tasks::FinalizedLedger;

#[cfg(test)]
mod tests;
