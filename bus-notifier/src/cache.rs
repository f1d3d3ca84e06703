//! Caching layer for live snapshots.
//!
//! Every subscriber of a route key shares one snapshot per poll window. The
//! TTL is on the order of the poll interval, so a cache hit only ever
//! returns data from the current or immediately preceding cycle.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::{LiveSnapshot, RouteKey};
use crate::source::{LiveStatusSource, SourceError};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
        }
    }
}

/// Result of [`CachedSource::lookup`].
#[derive(Debug, Clone)]
pub struct Lookup {
    pub snapshot: Arc<LiveSnapshot>,
    /// Fetched from the source rather than served from the cache
    pub fresh: bool,
}

/// Live source with per-key caching.
///
/// Wraps any `LiveStatusSource` and caches successful snapshots. Failed
/// fetches are not cached, so the next cycle retries them.
pub struct CachedSource<S> {
    source: S,
    snapshots: MokaCache<RouteKey, Arc<LiveSnapshot>>,
}

impl<S: LiveStatusSource> CachedSource<S> {
    /// Create a new cached source.
    pub fn new(source: S, config: &CacheConfig) -> Self {
        let snapshots = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { source, snapshots }
    }

    /// Get the snapshot for `key`, fetching only on a cache miss.
    ///
    /// A hit returns the earlier snapshot unmodified. A fetched snapshot is
    /// not stored until it is passed to [`CachedSource::commit`], so callers
    /// can finish with it first.
    pub async fn lookup(&self, key: &RouteKey) -> Result<Lookup, SourceError> {
        if let Some(cached) = self.snapshots.get(key).await {
            trace!(route = %key, "Snapshot cache hit");
            return Ok(Lookup {
                snapshot: cached,
                fresh: false,
            });
        }

        let snapshot = Arc::new(self.source.fetch(key).await?);
        Ok(Lookup {
            snapshot,
            fresh: true,
        })
    }

    /// Store a freshly fetched snapshot. Cache hits are left alone.
    pub async fn commit(&self, key: &RouteKey, lookup: &Lookup) {
        if lookup.fresh {
            self.snapshots
                .insert(key.clone(), lookup.snapshot.clone())
                .await;
        }
    }

    /// Access the underlying source for operations that bypass the cache.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, RouteInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that counts fetches and fails for route "bad".
    struct CountingSource {
        fetches: AtomicUsize,
    }

    impl LiveStatusSource for CountingSource {
        async fn routes(&self) -> Result<Vec<RouteInfo>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch(&self, key: &RouteKey) -> Result<LiveSnapshot, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if key.route == "bad" {
                return Err(SourceError::NoData(key.clone()));
            }
            Ok(LiveSnapshot::new(key.clone(), Vec::new()))
        }
    }

    fn cached(ttl: Duration) -> CachedSource<CountingSource> {
        let config = CacheConfig {
            ttl,
            ..CacheConfig::default()
        };
        CachedSource::new(
            CountingSource {
                fetches: AtomicUsize::new(0),
            },
            &config,
        )
    }

    async fn get(
        cache: &CachedSource<CountingSource>,
        key: &RouteKey,
    ) -> Result<Arc<LiveSnapshot>, SourceError> {
        let lookup = cache.lookup(key).await?;
        cache.commit(key, &lookup).await;
        Ok(lookup.snapshot)
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.max_capacity, 1000);
    }

    #[tokio::test]
    async fn hit_within_ttl_skips_fetch() {
        let cache = cached(Duration::from_secs(60));
        let key = RouteKey::new("672", "672", Direction::Inbound);

        let first = get(&cache, &key).await.unwrap();
        let second = get(&cache, &key).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_separately() {
        let cache = cached(Duration::from_secs(60));
        get(&cache, &RouteKey::new("672", "672", Direction::Inbound))
            .await
            .unwrap();
        get(&cache, &RouteKey::new("672", "672", Direction::Outbound))
            .await
            .unwrap();
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let cache = cached(Duration::from_millis(20));
        let key = RouteKey::new("672", "672", Direction::Inbound);

        get(&cache, &key).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        get(&cache, &key).await.unwrap();

        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = cached(Duration::from_secs(60));
        let key = RouteKey::new("bad", "bad", Direction::Inbound);

        assert!(get(&cache, &key).await.is_err());
        assert!(get(&cache, &key).await.is_err());
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookup_stores_nothing_until_commit() {
        let cache = cached(Duration::from_secs(60));
        let key = RouteKey::new("672", "672", Direction::Inbound);

        let first = cache.lookup(&key).await.unwrap();
        assert!(first.fresh);
        assert!(cache.lookup(&key).await.unwrap().fresh);
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);

        cache.commit(&key, &first).await;
        let hit = cache.lookup(&key).await.unwrap();
        assert!(!hit.fresh);
        assert!(Arc::ptr_eq(&hit.snapshot, &first.snapshot));
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);
    }
}
