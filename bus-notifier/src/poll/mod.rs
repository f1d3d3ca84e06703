//! Poll loop orchestration.
//!
//! Each cycle reads every subscription, fetches each distinct route key
//! once, and runs the proximity evaluator for every subscriber of that key.

mod cycle;
mod runner;

#[cfg(test)]
mod cycle_tests;

pub use cycle::{CycleReport, Poller};
pub use runner::PollConfig;
