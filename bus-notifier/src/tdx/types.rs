//! TDX API response DTOs.
//!
//! These types map directly to the TDX JSON responses. Fields the feed may
//! omit are `Option`; validation happens in `convert`.

use serde::Deserialize;

/// Localized name object used throughout the TDX API.
#[derive(Debug, Clone, Deserialize)]
pub struct NameType {
    #[serde(rename = "Zh_tw")]
    pub zh_tw: Option<String>,

    #[serde(rename = "En")]
    pub en: Option<String>,
}

/// One route from `/v2/Bus/Route/City/{city}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteDto {
    #[serde(rename = "RouteUID")]
    pub route_uid: String,

    #[serde(rename = "RouteID")]
    pub route_id: String,

    pub route_name: NameType,

    /// Name of the departure terminal.
    pub departure_stop_name_zh: Option<String>,

    /// Name of the destination terminal.
    pub destination_stop_name_zh: Option<String>,

    #[serde(default)]
    pub sub_routes: Vec<SubRouteDto>,
}

/// A sub-route entry nested in a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubRouteDto {
    #[serde(rename = "SubRouteUID")]
    pub sub_route_uid: String,

    pub sub_route_name: NameType,

    pub direction: i64,
}

/// One per-stop estimate from `/v2/Bus/EstimatedTimeOfArrival/City/{city}/{route}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EstimateDto {
    #[serde(rename = "StopUID")]
    pub stop_uid: Option<String>,

    #[serde(rename = "StopID")]
    pub stop_id: Option<String>,

    pub stop_name: Option<NameType>,

    #[serde(rename = "RouteUID")]
    pub route_uid: Option<String>,

    pub route_name: Option<NameType>,

    pub direction: Option<i64>,

    /// Seconds until arrival. Absent when no bus is running towards the stop.
    pub estimate_time: Option<i64>,

    /// 0 running, 1 not departed, 2 traffic control, 3 last bus passed, 4 not operating.
    pub stop_status: Option<i64>,

    /// Position of the stop along the sub-route.
    pub stop_sequence: Option<u32>,

    pub plate_numb: Option<String>,

    pub src_update_time: Option<String>,

    pub update_time: Option<String>,
}

/// OAuth token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Token lifetime in seconds.
    pub expires_in: u64,
}
