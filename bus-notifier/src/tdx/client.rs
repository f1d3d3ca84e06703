//! TDX bus API HTTP client.
//!
//! Provides async methods for the route listing and the per-route arrival
//! estimates. Handles bearer authentication, concurrency limiting, and
//! conversion to domain types.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::domain::{LiveSnapshot, RouteInfo, RouteKey};

use super::auth::CredentialProvider;
use super::convert::{convert_estimates, convert_routes};
use super::error::TdxError;
use super::types::{EstimateDto, RouteDto};

/// Default base URL for the TDX basic API.
const DEFAULT_BASE_URL: &str = "https://tdx.transportdata.tw/api/basic";

/// Default city whose bus network is queried.
const DEFAULT_CITY: &str = "Taipei";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Configuration for the TDX client.
#[derive(Debug, Clone)]
pub struct TdxConfig {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Base URL for the API (defaults to production TDX)
    pub base_url: String,
    /// City path segment, e.g. "Taipei" or "NewTaipei"
    pub city: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TdxConfig {
    /// Create a new config with the given client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            city: DEFAULT_CITY.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the city.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// TDX bus API client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
/// A token is requested from the credential provider before every call.
pub struct TdxClient<C> {
    http: reqwest::Client,
    base_url: Url,
    city: String,
    semaphore: Arc<Semaphore>,
    credentials: Arc<C>,
}

impl<C: CredentialProvider> TdxClient<C> {
    /// Create a new TDX client with the given configuration.
    pub fn new(config: &TdxConfig, credentials: C) -> Result<Self, TdxError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| TdxError::Api {
            status: 0,
            message: format!("invalid base URL {:?}: {e}", config.base_url),
        })?;

        Ok(Self {
            http,
            base_url,
            city: config.city.clone(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            credentials: Arc::new(credentials),
        })
    }

    /// URL of the route listing for the configured city.
    pub fn routes_url(&self) -> Result<Url, TdxError> {
        self.endpoint(&["v2", "Bus", "Route", "City", &self.city], &[])
    }

    /// URL of the arrival estimates for one sub-route and direction.
    pub fn estimates_url(&self, key: &RouteKey) -> Result<Url, TdxError> {
        let filter = format!("Direction eq {}", key.direction.code());
        self.endpoint(
            &[
                "v2",
                "Bus",
                "EstimatedTimeOfArrival",
                "City",
                &self.city,
                &key.sub_route,
            ],
            &[("$filter", &filter)],
        )
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, TdxError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TdxError::Api {
                status: 0,
                message: format!("base URL {} cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("$format", "JSON");
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TdxError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TdxError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let token = self.credentials.access_token().await?;

        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TdxError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TdxError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TdxError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| TdxError::json(e, &body))
    }

    /// Get every route (with sub-routes) in the configured city.
    pub async fn get_routes(&self) -> Result<Vec<RouteInfo>, TdxError> {
        let url = self.routes_url()?;
        let routes: Vec<RouteDto> = self.get_json(url).await?;
        Ok(convert_routes(&routes))
    }

    /// Get the live estimates for one sub-route and direction.
    pub async fn get_estimates(&self, key: &RouteKey) -> Result<LiveSnapshot, TdxError> {
        let url = self.estimates_url(key)?;
        let items: Vec<EstimateDto> = self.get_json(url).await?;
        Ok(convert_estimates(key, &items)?)
    }
}
