//! Notification sinks.
//!
//! Emission is fire-and-forget: a sink never reports failure back to the
//! poll loop.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::NotificationEvent;

/// Receives notification events.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: NotificationEvent);
}

/// Writes each event to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn emit(&self, event: NotificationEvent) {
        info!(
            user = %event.user,
            route = %event.route,
            stop = %event.target_stop,
            distance = %event.distance,
            "Notification for user {}: {}",
            event.user,
            event.message()
        );
    }
}

/// Forwards events to a channel, for a delivery task or for tests.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn emit(&self, event: NotificationEvent) {
        if self.tx.send(event).is_err() {
            debug!("Notification receiver dropped; discarding event");
        }
    }
}
