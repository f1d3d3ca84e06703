//! The poll loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::notify::Notifier;
use crate::source::LiveStatusSource;
use crate::store::SubscriptionStore;

use super::cycle::Poller;

/// Configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between cycles.
    pub interval: Duration,

    /// Time between route catalog refreshes.
    pub catalog_refresh: Duration,
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            catalog_refresh: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl<S, St, N> Poller<S, St, N>
where
    S: LiveStatusSource,
    St: SubscriptionStore,
    N: Notifier,
{
    /// Poll until `shutdown` completes.
    ///
    /// The first cycle runs immediately. A cycle in progress when shutdown
    /// is requested runs to completion before the loop exits. Cycle errors
    /// are logged and the loop carries on.
    pub async fn run(&self, config: &PollConfig, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut refresh = tokio::time::interval(config.catalog_refresh);
        refresh.tick().await; // First tick is immediate, skip it

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Poll cycle failed");
                    }
                }
                _ = refresh.tick() => {
                    match self.subscriptions().catalog().refresh(self.source().source()).await {
                        Ok(count) => info!(routes = count, "Refreshed route catalog"),
                        Err(e) => warn!(error = %e, "Failed to refresh route catalog"),
                    }
                }
            }
        }
    }
}
