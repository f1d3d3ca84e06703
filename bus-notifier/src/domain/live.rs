//! Live per-stop records produced every poll.

use chrono::{DateTime, FixedOffset};

use super::{RouteKey, Stop};

/// Discrete bus status at a stop, using TDX's `StopStatus` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopStatus {
    /// Code 0: a bus is running towards this stop and has an estimate.
    Approaching,
    /// Code 1: the next bus has not left its terminal yet.
    NotDeparted,
    /// Code 2: traffic control, the stop is not being served.
    Suspended,
    /// Code 3: the last bus of the day has passed.
    LastBusPassed,
    /// Code 4: not operating today.
    NotOperating,
    /// Any code the feed documents later.
    Unknown(i64),
}

impl StopStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => StopStatus::Approaching,
            1 => StopStatus::NotDeparted,
            2 => StopStatus::Suspended,
            3 => StopStatus::LastBusPassed,
            4 => StopStatus::NotOperating,
            other => StopStatus::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            StopStatus::Approaching => 0,
            StopStatus::NotDeparted => 1,
            StopStatus::Suspended => 2,
            StopStatus::LastBusPassed => 3,
            StopStatus::NotOperating => 4,
            StopStatus::Unknown(code) => code,
        }
    }
}

/// Live datum for one stop within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStopRecord {
    pub stop: Stop,
    pub status: StopStatus,
    /// Seconds until the next bus arrives, when the feed has an estimate.
    pub estimate_secs: Option<i64>,
    /// When the upstream system last updated this record.
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl LiveStopRecord {
    pub fn new(stop: Stop, status: StopStatus) -> Self {
        Self {
            stop,
            status,
            estimate_secs: None,
            updated_at: None,
        }
    }

    pub fn with_estimate(mut self, secs: i64) -> Self {
        self.estimate_secs = Some(secs);
        self
    }
}

/// Validated, ordered live records for one route key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub key: RouteKey,
    pub records: Vec<LiveStopRecord>,
}

impl LiveSnapshot {
    pub fn new(key: RouteKey, records: Vec<LiveStopRecord>) -> Self {
        Self { key, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
