//! TDX client error types.

use super::convert::ConversionError;

/// Errors from the TDX HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum TdxError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON parse error: {message}{}", body_suffix(.body))]
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the API
    #[error("rate limited by TDX API")]
    RateLimited,

    /// Invalid or expired access token
    #[error("unauthorized (check TDX_CLIENT_ID and TDX_CLIENT_SECRET)")]
    Unauthorized,

    /// Could not obtain an access token
    #[error("failed to obtain access token: {0}")]
    Token(String),

    /// Response parsed but failed domain validation
    #[error("invalid feed data: {0}")]
    Conversion(#[from] ConversionError),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_ref()
        .map(|b| format!(" (body: {b})"))
        .unwrap_or_default()
}

impl TdxError {
    /// Build a JSON error, keeping a short prefix of the offending body.
    pub(crate) fn json(err: serde_json::Error, body: &str) -> Self {
        TdxError::Json {
            message: err.to_string(),
            body: Some(body.chars().take(500).collect()),
        }
    }
}
