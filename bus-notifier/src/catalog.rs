//! Route catalog.
//!
//! Maps route names to their metadata and sub-routes. Loaded from the live
//! source at startup and refreshed in the background; readers always see a
//! complete map because refresh swaps it whole.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Direction, RouteInfo, RouteKey};
use crate::source::{LiveStatusSource, SourceError};

/// A subscription named something the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("route {0} not found")]
    UnknownRoute(String),

    #[error("sub-route {sub_route} with direction {direction} not found in route {route}")]
    UnknownSubRoute {
        route: String,
        sub_route: String,
        direction: Direction,
    },
}

/// Thread-safe route lookup.
#[derive(Clone, Default)]
pub struct RouteCatalog {
    inner: Arc<RwLock<HashMap<String, RouteInfo>>>,
}

impl RouteCatalog {
    /// Create a catalog from known routes.
    pub fn from_routes(routes: impl IntoIterator<Item = RouteInfo>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(build_map(routes))),
        }
    }

    /// Create a catalog by fetching routes from the source.
    pub async fn fetch<S: LiveStatusSource>(source: &S) -> Result<Self, SourceError> {
        let routes = source.routes().await?;
        Ok(Self::from_routes(routes))
    }

    /// Refresh the catalog from the source.
    ///
    /// On success, replaces the current mapping. On failure, the existing
    /// mapping is preserved and the error is returned.
    pub async fn refresh<S: LiveStatusSource>(&self, source: &S) -> Result<usize, SourceError> {
        let map = build_map(source.routes().await?);
        let count = map.len();

        let mut guard = self.inner.write().await;
        *guard = map;

        Ok(count)
    }

    /// Look up a route by name.
    pub async fn get(&self, route: &str) -> Option<RouteInfo> {
        let guard = self.inner.read().await;
        guard.get(route).cloned()
    }

    /// Check that a (route, sub-route, direction) exists.
    pub async fn validate(
        &self,
        route: &str,
        sub_route: &str,
        direction: Direction,
    ) -> Result<(), ValidationError> {
        let guard = self.inner.read().await;
        let info = guard
            .get(route)
            .ok_or_else(|| ValidationError::UnknownRoute(route.to_string()))?;

        if !info.has_sub_route(sub_route, direction) {
            return Err(ValidationError::UnknownSubRoute {
                route: route.to_string(),
                sub_route: sub_route.to_string(),
                direction,
            });
        }
        Ok(())
    }

    /// Terminal stop the bus on `key` is heading to, if known.
    pub async fn terminal(&self, key: &RouteKey) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .get(&key.route)
            .map(|info| info.terminal_for(key.direction))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// All routes, sorted by name.
    pub async fn list(&self) -> Vec<RouteInfo> {
        let guard = self.inner.read().await;
        let mut routes: Vec<RouteInfo> = guard.values().cloned().collect();
        routes.sort_by(|a, b| a.name.zh_tw.cmp(&b.name.zh_tw));
        routes
    }

    /// Get the number of routes in the catalog.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Build the name → route map. Later duplicates replace earlier ones.
fn build_map(routes: impl IntoIterator<Item = RouteInfo>) -> HashMap<String, RouteInfo> {
    routes
        .into_iter()
        .map(|r| (r.name.zh_tw.clone(), r))
        .collect()
}
