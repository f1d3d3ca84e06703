//! Proximity detection: decides which subscribers to notify.
//!
//! Given a snapshot of live per-stop records for one route key and a target
//! stop, the evaluator reports how far away the bus is if, and only if, a
//! notification should fire now. Two interchangeable policies exist: an
//! index window over stop statuses and a time window over arrival estimates.

mod config;
mod evaluate;


pub use config::{Policy, ProximityConfig, UnknownPolicy};
pub use evaluate::{ProximityEvaluator, index_window, time_window};
