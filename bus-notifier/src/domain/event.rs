//! Notification events produced by the proximity evaluator.

use std::fmt;

use super::{RouteKey, UserId};

/// How far the bus is from the target stop when a notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distance {
    /// Stops between the detected bus and the target.
    Stops(usize),
    /// Whole minutes until the predicted arrival.
    Minutes(i64),
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Stops(1) => f.write_str("1 stop"),
            Distance::Stops(n) => write!(f, "{n} stops"),
            Distance::Minutes(1) => f.write_str("1 minute"),
            Distance::Minutes(n) => write!(f, "{n} minutes"),
        }
    }
}

/// A single "your bus is coming" notification. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub user: UserId,
    pub target_stop: String,
    pub distance: Distance,
    pub route: RouteKey,
    /// Terminal the bus is heading to, when the catalog knows it.
    pub terminal: Option<String>,
}

impl NotificationEvent {
    /// Human-readable message for the user.
    pub fn message(&self) -> String {
        let towards = match &self.terminal {
            Some(t) => format!("{} (to {t})", self.route.sub_route),
            None => self.route.sub_route.clone(),
        };
        match self.distance {
            Distance::Stops(_) => format!(
                "The bus on route {towards} is {} away from {}.",
                self.distance, self.target_stop
            ),
            Distance::Minutes(_) => format!(
                "The bus on route {towards} will arrive at {} in {}.",
                self.target_stop, self.distance
            ),
        }
    }
}
