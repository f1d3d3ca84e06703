//! Proximity evaluation configuration.

use std::fmt;
use std::str::FromStr;

/// Which matching policy decides when to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Look for an approaching bus a few stops before the target.
    IndexWindow,
    /// Notify when the target's arrival estimate falls in a minute band.
    TimeWindow,
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown policy {0:?} (expected \"index\" or \"time\")")]
pub struct UnknownPolicy(String);

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" | "index-window" | "stops" => Ok(Policy::IndexWindow),
            "time" | "time-window" | "minutes" => Ok(Policy::TimeWindow),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::IndexWindow => f.write_str("index"),
            Policy::TimeWindow => f.write_str("time"),
        }
    }
}

/// Configuration parameters for proximity evaluation.
#[derive(Debug, Clone)]
pub struct ProximityConfig {
    /// Active matching policy.
    pub policy: Policy,

    /// How many stops before the target the index window reaches back.
    pub lookback_stops: usize,

    /// Stops immediately before the target that the index window ignores.
    /// A bus this close is treated as already too late to notify about.
    pub skip_stops: usize,

    /// Smallest lead time (whole minutes) that fires under the time window.
    pub min_minutes: i64,

    /// Largest lead time (whole minutes) that fires under the time window.
    pub max_minutes: i64,
}

impl ProximityConfig {
    /// Default thresholds with the given policy.
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Set the index window bounds.
    pub fn with_index_window(mut self, lookback_stops: usize, skip_stops: usize) -> Self {
        self.lookback_stops = lookback_stops;
        self.skip_stops = skip_stops;
        self
    }

    /// Set the time window bounds (inclusive, whole minutes).
    pub fn with_time_window(mut self, min_minutes: i64, max_minutes: i64) -> Self {
        self.min_minutes = min_minutes;
        self.max_minutes = max_minutes;
        self
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            policy: Policy::TimeWindow,
            lookback_stops: 5,
            skip_stops: 2,
            min_minutes: 3,
            max_minutes: 10,
        }
    }
}
