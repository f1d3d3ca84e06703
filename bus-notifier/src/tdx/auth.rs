//! Access-token supply for the TDX API.
//!
//! TDX uses OAuth client credentials. Tokens live for a day; we cache one
//! and fetch a new one shortly before it expires.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use super::error::TdxError;
use super::types::TokenResponse;

/// Default token endpoint.
const DEFAULT_TOKEN_URL: &str =
    "https://tdx.transportdata.tw/auth/realms/TDXConnect/protocol/openid-connect/token";

/// Tokens are refreshed this long before their reported expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for API requests.
pub trait CredentialProvider: Send + Sync {
    /// A currently valid access token.
    fn access_token(&self) -> impl Future<Output = Result<String, TdxError>> + Send;
}

/// A fixed token, for tests and pre-issued credentials.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, TdxError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(token: String, expires_in: Duration, now: Instant) -> Self {
        Self {
            token,
            refresh_at: now + expires_in.saturating_sub(REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

/// Client-credentials token provider with an in-memory cache.
pub struct TdxAuth {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TdxAuth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TdxError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        })
    }

    /// Set a custom token endpoint (for testing).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    async fn request_token(&self) -> Result<TokenResponse, TdxError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TdxError::Token(format!("{status}: {body}")));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TdxError::json(e, &body))
    }
}

impl CredentialProvider for TdxAuth {
    async fn access_token(&self) -> Result<String, TdxError> {
        // Held across the request so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.token.clone());
        }

        let response = self.request_token().await?;
        debug!(expires_in = response.expires_in, "Fetched new TDX access token");

        let token = CachedToken::new(
            response.access_token,
            Duration::from_secs(response.expires_in),
            Instant::now(),
        );
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_refreshes_before_expiry() {
        let now = Instant::now();
        let token = CachedToken::new("t".into(), Duration::from_secs(3600), now);

        assert!(token.is_fresh(now));
        assert!(token.is_fresh(now + Duration::from_secs(3539)));
        assert!(!token.is_fresh(now + Duration::from_secs(3540)));
    }

    #[test]
    fn short_lived_token_is_never_fresh() {
        let now = Instant::now();
        let token = CachedToken::new("t".into(), Duration::from_secs(30), now);
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let provider = StaticToken("abc".into());
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[test]
    fn auth_creation() {
        let auth = TdxAuth::new("id", "secret", Duration::from_secs(5))
            .unwrap()
            .with_token_url("http://localhost:9/token");
        assert_eq!(auth.token_url, "http://localhost:9/token");
    }
}
