//! Tests for poll cycles and the poll loop.

use super::*;
use crate::cache::{CacheConfig, CachedSource};
use crate::catalog::RouteCatalog;
use crate::domain::{
    Direction, Distance, LiveSnapshot, LiveStopRecord, Name, NotificationEvent, RouteInfo,
    RouteKey, Stop, StopStatus, StopUid, SubRoute, Subscription, UserId,
};
use crate::notify::ChannelNotifier;
use crate::proximity::{Policy, ProximityConfig, ProximityEvaluator};
use crate::source::{LiveStatusSource, SourceError};
use crate::store::{MemoryStore, Subscriptions};
use crate::tdx::{CredentialProvider, TdxClient, TdxConfig, TdxError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn record(name: &str, status: StopStatus, estimate: Option<i64>) -> LiveStopRecord {
    let stop = Stop::new(StopUid::parse(name).unwrap(), name, Name::zh(name));
    LiveStopRecord {
        stop,
        status,
        estimate_secs: estimate,
        updated_at: None,
    }
}

fn route(name: &str) -> RouteInfo {
    let sub_routes = [Direction::Outbound, Direction::Inbound]
        .into_iter()
        .map(|d| {
            let sub = SubRoute {
                uid: format!("{name}{d}"),
                name: Name::zh(name),
                direction: d,
            };
            ((name.to_string(), d), sub)
        })
        .collect();
    RouteInfo {
        uid: name.to_string(),
        id: name.to_string(),
        name: Name::zh(name),
        departure_stop: "大鵬新城".into(),
        destination_stop: "博仁醫院".into(),
        sub_routes,
    }
}

/// Mock source with per-key snapshots and fetch counting.
#[derive(Default)]
struct MockSource {
    snapshots: HashMap<RouteKey, Vec<LiveStopRecord>>,
    calls: Mutex<HashMap<RouteKey, usize>>,
}

impl MockSource {
    fn with(mut self, key: RouteKey, records: Vec<LiveStopRecord>) -> Self {
        self.snapshots.insert(key, records);
        self
    }

    fn calls_for(&self, key: &RouteKey) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl LiveStatusSource for MockSource {
    async fn routes(&self) -> Result<Vec<RouteInfo>, SourceError> {
        Ok(vec![route("672"), route("藍29"), route("307")])
    }

    async fn fetch(&self, key: &RouteKey) -> Result<LiveSnapshot, SourceError> {
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.snapshots
            .get(key)
            .map(|records| LiveSnapshot::new(key.clone(), records.clone()))
            .ok_or_else(|| SourceError::NoData(key.clone()))
    }
}

fn key(route: &str, direction: Direction) -> RouteKey {
    RouteKey::new(route, route, direction)
}

fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

/// Records where stop "B" is four minutes away and "C" is fifteen.
fn timed_records() -> Vec<LiveStopRecord> {
    vec![
        record("A", StopStatus::Approaching, Some(60)),
        record("B", StopStatus::Approaching, Some(240)),
        record("C", StopStatus::Approaching, Some(900)),
    ]
}

type TestPoller = Poller<MockSource, MemoryStore, ChannelNotifier>;

fn poller(
    source: MockSource,
    policy: Policy,
) -> (TestPoller, UnboundedReceiver<NotificationEvent>) {
    let catalog = RouteCatalog::from_routes([route("672"), route("藍29")]);
    let subscriptions = Arc::new(Subscriptions::new(MemoryStore::new(), catalog));
    let (notifier, rx) = ChannelNotifier::channel();
    let poller = Poller::new(
        CachedSource::new(source, &CacheConfig::default()),
        subscriptions,
        ProximityEvaluator::new(ProximityConfig::with_policy(policy)),
        notifier,
    );
    (poller, rx)
}

async fn subscribe<S: LiveStatusSource>(
    poller: &Poller<S, MemoryStore, ChannelNotifier>,
    id: &str,
    route: &str,
    direction: Direction,
    stop: &str,
) {
    poller
        .subscriptions()
        .subscribe(&user(id), Subscription::new(route, route, direction, stop))
        .await
        .unwrap();
}

fn drain(rx: &mut UnboundedReceiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

#[tokio::test]
async fn no_subscriptions_means_no_fetches() {
    let source = MockSource::default().with(key("672", Direction::Inbound), timed_records());
    let (poller, mut rx) = poller(source, Policy::TimeWindow);

    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report, CycleReport::default());
    assert_eq!(poller.source().source().total_calls(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn shared_route_key_is_fetched_once() {
    let k = key("672", Direction::Inbound);
    let source = MockSource::default().with(k.clone(), timed_records());
    let (poller, mut rx) = poller(source, Policy::TimeWindow);

    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;
    subscribe(&poller, "user2", "672", Direction::Inbound, "C").await;

    let report = poller.run_cycle().await.unwrap();

    assert_eq!(poller.source().source().calls_for(&k), 1);
    assert_eq!(report.subscriptions, 2);
    assert_eq!(report.routes, 1);
    assert_eq!(report.notifications, 1);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user, user("user1"));
    assert_eq!(events[0].distance, Distance::Minutes(4));
    assert_eq!(events[0].terminal.as_deref(), Some("大鵬新城"));
}

#[tokio::test]
async fn failed_route_does_not_block_others() {
    let good = key("672", Direction::Inbound);
    let source = MockSource::default().with(good.clone(), timed_records());
    let (poller, mut rx) = poller(source, Policy::TimeWindow);

    // 藍29 is in the catalog but the source has no data for it.
    subscribe(&poller, "user1", "藍29", Direction::Outbound, "B").await;
    subscribe(&poller, "user2", "672", Direction::Inbound, "B").await;

    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.routes, 2);
    assert_eq!(report.failed_routes, 1);
    assert_eq!(report.notifications, 1);
    let events = drain(&mut rx);
    assert_eq!(events[0].user, user("user2"));
}

#[tokio::test]
async fn second_cycle_within_ttl_reuses_snapshot() {
    let k = key("672", Direction::Inbound);
    let source = MockSource::default().with(k.clone(), timed_records());
    let (poller, mut rx) = poller(source, Policy::TimeWindow);
    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;

    poller.run_cycle().await.unwrap();
    poller.run_cycle().await.unwrap();

    assert_eq!(poller.source().source().calls_for(&k), 1);
    assert_eq!(drain(&mut rx).len(), 2);
}

#[tokio::test]
async fn index_policy_reports_stops_away() {
    let k = key("672", Direction::Outbound);
    let statuses = [1, 1, 0, 0, 1, 1];
    let records = statuses
        .iter()
        .zip(["A", "B", "C", "D", "E", "F"])
        .map(|(&code, name)| record(name, StopStatus::from_code(code), None))
        .collect();
    let source = MockSource::default().with(k, records);
    let (poller, mut rx) = poller(source, Policy::IndexWindow);

    subscribe(&poller, "user1", "672", Direction::Outbound, "F").await;
    subscribe(&poller, "user2", "672", Direction::Outbound, "B").await;
    subscribe(&poller, "user3", "672", Direction::Outbound, "Z").await;

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.notifications, 1);

    let events = drain(&mut rx);
    assert_eq!(events[0].user, user("user1"));
    assert_eq!(events[0].distance, Distance::Stops(3));
    assert_eq!(events[0].terminal.as_deref(), Some("博仁醫院"));
}

#[tokio::test]
async fn run_loop_stops_on_shutdown_after_first_cycle() {
    let k = key("672", Direction::Inbound);
    let source = MockSource::default().with(k.clone(), timed_records());
    let (poller, mut rx) = poller(source, Policy::TimeWindow);
    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;

    let config = PollConfig::default().with_interval(Duration::from_secs(3600));
    let shutdown = tokio::time::sleep(Duration::from_millis(50));
    poller.run(&config, shutdown).await;

    assert_eq!(poller.source().source().calls_for(&k), 1);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn committed_snapshot_serves_next_lookup() {
    let k = key("672", Direction::Inbound);
    let source = MockSource::default().with(k.clone(), timed_records());
    let (poller, _rx) = poller(source, Policy::TimeWindow);
    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;

    poller.run_cycle().await.unwrap();

    let lookup = poller.source().lookup(&k).await.unwrap();
    assert!(!lookup.fresh);
    assert_eq!(poller.source().source().calls_for(&k), 1);
}

/// Credential provider whose token endpoint always fails.
struct RejectedToken {
    requests: Arc<AtomicUsize>,
}

impl CredentialProvider for RejectedToken {
    async fn access_token(&self) -> Result<String, TdxError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Err(TdxError::Token("invalid_client".into()))
    }
}

fn tdx_poller() -> (
    Poller<TdxClient<RejectedToken>, MemoryStore, ChannelNotifier>,
    Arc<AtomicUsize>,
    UnboundedReceiver<NotificationEvent>,
) {
    let requests = Arc::new(AtomicUsize::new(0));
    let credentials = RejectedToken {
        requests: requests.clone(),
    };
    let client = TdxClient::new(&TdxConfig::new("id", "secret"), credentials).unwrap();
    let catalog = RouteCatalog::from_routes([route("672"), route("藍29")]);
    let (notifier, rx) = ChannelNotifier::channel();
    let poller = Poller::new(
        CachedSource::new(client, &CacheConfig::default()),
        Arc::new(Subscriptions::new(MemoryStore::new(), catalog)),
        ProximityEvaluator::default(),
        notifier,
    );
    (poller, requests, rx)
}

#[tokio::test]
async fn credential_failure_fails_every_route() {
    let (poller, token_requests, mut rx) = tdx_poller();
    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;
    subscribe(&poller, "user2", "藍29", Direction::Outbound, "B").await;

    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.routes, 2);
    assert_eq!(report.failed_routes, report.routes);
    assert_eq!(report.notifications, 0);
    assert_eq!(token_requests.load(Ordering::SeqCst), 2);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn run_loop_survives_credential_failure() {
    let (poller, token_requests, _rx) = tdx_poller();
    subscribe(&poller, "user1", "672", Direction::Inbound, "B").await;

    let config = PollConfig::default().with_interval(Duration::from_millis(20));
    poller
        .run(&config, tokio::time::sleep(Duration::from_millis(150)))
        .await;

    // One token request per cycle; failures are never cached.
    assert!(token_requests.load(Ordering::SeqCst) >= 3);
}
