//! One poll cycle: fetch each watched route once, evaluate every subscriber.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::CachedSource;
use crate::domain::{RouteKey, Subscription, UserId};
use crate::notify::Notifier;
use crate::proximity::ProximityEvaluator;
use crate::source::LiveStatusSource;
use crate::store::{StoreError, SubscriptionStore, Subscriptions};

/// What a cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Subscriptions considered.
    pub subscriptions: usize,
    /// Distinct route keys watched.
    pub routes: usize,
    /// Route keys whose snapshot could not be fetched.
    pub failed_routes: usize,
    /// Notifications emitted.
    pub notifications: usize,
}

/// Subscribers grouped by the route key they watch.
type Watchers = BTreeMap<RouteKey, Vec<(UserId, Subscription)>>;

fn group_by_route(all: Vec<(UserId, Vec<Subscription>)>) -> Watchers {
    let mut watchers = Watchers::new();
    for (user, subs) in all {
        for sub in subs {
            watchers
                .entry(sub.route_key())
                .or_default()
                .push((user.clone(), sub));
        }
    }
    watchers
}

/// Runs poll cycles over a source, a subscription store and a sink.
pub struct Poller<S, St, N> {
    source: CachedSource<S>,
    subscriptions: Arc<Subscriptions<St>>,
    evaluator: ProximityEvaluator,
    notifier: N,
}

impl<S, St, N> Poller<S, St, N>
where
    S: LiveStatusSource,
    St: SubscriptionStore,
    N: Notifier,
{
    pub fn new(
        source: CachedSource<S>,
        subscriptions: Arc<Subscriptions<St>>,
        evaluator: ProximityEvaluator,
        notifier: N,
    ) -> Self {
        Self {
            source,
            subscriptions,
            evaluator,
            notifier,
        }
    }

    pub fn source(&self) -> &CachedSource<S> {
        &self.source
    }

    pub fn subscriptions(&self) -> &Subscriptions<St> {
        &self.subscriptions
    }

    /// Run one cycle.
    ///
    /// Each distinct route key is fetched at most once, concurrently with the
    /// others. A key that fails to fetch is skipped without affecting the
    /// rest. Only a failure to list subscriptions aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let watchers = group_by_route(self.subscriptions.all().await?);

        let mut report = CycleReport {
            subscriptions: watchers.values().map(Vec::len).sum(),
            routes: watchers.len(),
            ..CycleReport::default()
        };

        if watchers.is_empty() {
            return Ok(report);
        }

        let fetches = watchers
            .keys()
            .map(|key| async move { (key, self.source.lookup(key).await) });
        let results = join_all(fetches).await;

        let catalog = self.subscriptions.catalog();
        for (key, result) in results {
            let lookup = match result {
                Ok(lookup) => lookup,
                Err(e) => {
                    warn!(route = %key, error = %e, "Skipping route this cycle");
                    report.failed_routes += 1;
                    continue;
                }
            };

            let snapshot = &lookup.snapshot;
            if snapshot.is_empty() {
                debug!(route = %key, "No live records for route");
            }

            let terminal = catalog.terminal(key).await;
            for (user, sub) in &watchers[key] {
                if let Some(event) = self.evaluator.notification_for(
                    user,
                    sub,
                    &snapshot.records,
                    terminal.as_deref(),
                ) {
                    self.notifier.emit(event);
                    report.notifications += 1;
                }
            }

            // Only cache once every watcher of this key has been handled
            self.source.commit(key, &lookup).await;
        }

        debug!(
            subscriptions = report.subscriptions,
            routes = report.routes,
            failed = report.failed_routes,
            notifications = report.notifications,
            "Poll cycle complete"
        );

        Ok(report)
    }
}
