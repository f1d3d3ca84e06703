//! TDX (Transport Data eXchange) bus API client.
//!
//! This module provides an HTTP client for Taiwan's TDX platform, which
//! publishes route metadata and real-time arrival estimates.
//!
//! Key characteristics of TDX:
//! - Every request needs an OAuth bearer token from the client-credentials flow
//! - Estimates are per stop, in seconds, with a separate discrete status code
//! - The ETA endpoint is keyed by route name and filtered by direction

mod auth;
mod client;
mod convert;
mod error;
mod types;

pub use auth::{CredentialProvider, StaticToken, TdxAuth};
pub use client::{TdxClient, TdxConfig};
pub use convert::{ConversionError, convert_estimate, convert_estimates, convert_route, convert_routes};
pub use error::TdxError;
pub use types::{EstimateDto, NameType, RouteDto, SubRouteDto, TokenResponse};
