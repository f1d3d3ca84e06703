//! Live status sources.
//!
//! The poll loop only talks to a [`LiveStatusSource`]; the real TDX client
//! and the offline simulator both implement it.

use std::future::Future;

use crate::domain::{LiveSnapshot, RouteInfo, RouteKey};
use crate::simulator::SimulatedSource;
use crate::tdx::{CredentialProvider, TdxAuth, TdxClient, TdxError};

/// Error from a live status source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Fetching one route key failed
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: RouteKey,
        #[source]
        source: TdxError,
    },

    /// Fetching the route catalog failed
    #[error("failed to fetch routes: {0}")]
    Routes(#[source] TdxError),

    /// The source has nothing for this route key
    #[error("no live data for {0}")]
    NoData(RouteKey),
}

/// Supplies route metadata and per-key live snapshots.
pub trait LiveStatusSource: Send + Sync {
    /// Every route the source can report on.
    fn routes(&self) -> impl Future<Output = Result<Vec<RouteInfo>, SourceError>> + Send;

    /// A fresh snapshot for one (route, sub-route, direction).
    fn fetch(
        &self,
        key: &RouteKey,
    ) -> impl Future<Output = Result<LiveSnapshot, SourceError>> + Send;
}

impl<C: CredentialProvider> LiveStatusSource for TdxClient<C> {
    async fn routes(&self) -> Result<Vec<RouteInfo>, SourceError> {
        self.get_routes().await.map_err(SourceError::Routes)
    }

    async fn fetch(&self, key: &RouteKey) -> Result<LiveSnapshot, SourceError> {
        self.get_estimates(key)
            .await
            .map_err(|source| SourceError::Fetch {
                key: key.clone(),
                source,
            })
    }
}

/// The source selected at startup.
pub enum AnySource {
    Tdx(TdxClient<TdxAuth>),
    Simulated(SimulatedSource),
}

impl LiveStatusSource for AnySource {
    async fn routes(&self) -> Result<Vec<RouteInfo>, SourceError> {
        match self {
            AnySource::Tdx(client) => client.routes().await,
            AnySource::Simulated(sim) => sim.routes().await,
        }
    }

    async fn fetch(&self, key: &RouteKey) -> Result<LiveSnapshot, SourceError> {
        match self {
            AnySource::Tdx(client) => client.fetch(key).await,
            AnySource::Simulated(sim) => sim.fetch(key).await,
        }
    }
}
