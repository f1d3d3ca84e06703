//! Proximity decisions: should this subscriber be told now?
//!
//! Both policies are pure functions of a snapshot and a target stop name.
//! A target that is not on the snapshot is not an error; the sub-route may
//! simply not serve that stop segment right now.

use crate::domain::{
    Distance, LiveStopRecord, NotificationEvent, StopStatus, Subscription, UserId,
};

use super::config::{Policy, ProximityConfig};

/// Index-window policy over discrete stop statuses.
///
/// Scans indices `[t - lookback, t - skip)` in ascending order, where `t` is
/// the target's index, and fires on the first approaching bus. The reported
/// distance is in stops.
pub fn index_window(
    records: &[LiveStopRecord],
    target: &str,
    lookback: usize,
    skip: usize,
) -> Option<Distance> {
    let t = records.iter().position(|r| r.stop.is_named(target))?;
    let start = t.saturating_sub(lookback);
    let end = t.saturating_sub(skip);

    (start..end)
        .find(|&i| records[i].status == StopStatus::Approaching)
        .map(|i| Distance::Stops(t - i))
}

/// Time-window policy over arrival estimates.
///
/// Fires when the target's estimate, floored to whole minutes, lies in
/// `[min_minutes, max_minutes]`.
pub fn time_window(
    records: &[LiveStopRecord],
    target: &str,
    min_minutes: i64,
    max_minutes: i64,
) -> Option<Distance> {
    let record = records.iter().find(|r| r.stop.is_named(target))?;
    let minutes = record.estimate_secs?.div_euclid(60);

    (min_minutes..=max_minutes)
        .contains(&minutes)
        .then_some(Distance::Minutes(minutes))
}

/// Applies the configured policy.
#[derive(Debug, Clone)]
pub struct ProximityEvaluator {
    config: ProximityConfig,
}

impl ProximityEvaluator {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Distance to report for `target`, if a notification should fire.
    pub fn evaluate(&self, records: &[LiveStopRecord], target: &str) -> Option<Distance> {
        let c = &self.config;
        match c.policy {
            Policy::IndexWindow => index_window(records, target, c.lookback_stops, c.skip_stops),
            Policy::TimeWindow => time_window(records, target, c.min_minutes, c.max_minutes),
        }
    }

    /// Evaluate one subscription against the snapshot for its route key.
    pub fn notification_for(
        &self,
        user: &UserId,
        subscription: &Subscription,
        records: &[LiveStopRecord],
        terminal: Option<&str>,
    ) -> Option<NotificationEvent> {
        let distance = self.evaluate(records, &subscription.target_stop)?;
        Some(NotificationEvent {
            user: user.clone(),
            target_stop: subscription.target_stop.clone(),
            distance,
            route: subscription.route_key(),
            terminal: terminal.map(str::to_string),
        })
    }
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}
