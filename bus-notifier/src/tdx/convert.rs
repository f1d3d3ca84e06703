//! Conversion from TDX DTOs to domain types.
//!
//! This is the validation boundary: records missing required fields are
//! rejected here so the proximity logic only ever sees well-formed data.

use std::collections::{BTreeMap, HashSet};

use chrono::DateTime;
use tracing::warn;

use crate::domain::{
    Direction, DomainError, LiveSnapshot, LiveStopRecord, Name, RouteInfo, RouteKey, Stop,
    StopStatus, StopUid, SubRoute,
};

use super::types::{EstimateDto, NameType, RouteDto};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but failed domain validation
    #[error(transparent)]
    Domain(#[from] DomainError),
}

fn convert_name(name: &NameType, field: &'static str) -> Result<Name, ConversionError> {
    let zh_tw = name
        .zh_tw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConversionError::MissingField(field))?;

    Ok(Name {
        zh_tw: zh_tw.to_string(),
        en: name.en.clone().filter(|s| !s.is_empty()),
    })
}

/// Convert one route and its sub-routes.
pub fn convert_route(dto: &RouteDto) -> Result<RouteInfo, ConversionError> {
    let name = convert_name(&dto.route_name, "RouteName.Zh_tw")?;

    let mut sub_routes = BTreeMap::new();
    for sub in &dto.sub_routes {
        let sub_name = convert_name(&sub.sub_route_name, "SubRouteName.Zh_tw")?;
        let direction = Direction::from_code(sub.direction)?;
        sub_routes.insert(
            (sub_name.zh_tw.clone(), direction),
            SubRoute {
                uid: sub.sub_route_uid.clone(),
                name: sub_name,
                direction,
            },
        );
    }

    Ok(RouteInfo {
        uid: dto.route_uid.clone(),
        id: dto.route_id.clone(),
        name,
        departure_stop: dto.departure_stop_name_zh.clone().unwrap_or_default(),
        destination_stop: dto.destination_stop_name_zh.clone().unwrap_or_default(),
        sub_routes,
    })
}

/// Convert a route listing, skipping (and logging) routes that fail validation.
pub fn convert_routes(routes: &[RouteDto]) -> Vec<RouteInfo> {
    routes
        .iter()
        .filter_map(|dto| match convert_route(dto) {
            Ok(route) => Some(route),
            Err(e) => {
                warn!(route_uid = %dto.route_uid, error = %e, "Skipping invalid route");
                None
            }
        })
        .collect()
}

/// Convert a single estimate record.
pub fn convert_estimate(item: &EstimateDto) -> Result<LiveStopRecord, ConversionError> {
    let uid = item
        .stop_uid
        .as_deref()
        .ok_or(ConversionError::MissingField("StopUID"))?;
    let uid = StopUid::parse(uid)?;

    let name = item
        .stop_name
        .as_ref()
        .ok_or(ConversionError::MissingField("StopName"))?;
    let name = convert_name(name, "StopName.Zh_tw")?;

    let status = item
        .stop_status
        .ok_or(ConversionError::MissingField("StopStatus"))?;

    let stop = Stop::new(uid, item.stop_id.clone().unwrap_or_default(), name);

    Ok(LiveStopRecord {
        stop,
        status: StopStatus::from_code(status),
        estimate_secs: item.estimate_time,
        updated_at: item
            .src_update_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok()),
    })
}

/// Whether an estimate belongs to the requested sub-route and direction.
///
/// The ETA endpoint is keyed by route name but also returns records for
/// sibling sub-routes sharing a prefix, so results are filtered by exact name.
fn belongs_to(item: &EstimateDto, key: &RouteKey) -> bool {
    let name_matches = item
        .route_name
        .as_ref()
        .and_then(|n| n.zh_tw.as_deref())
        .is_some_and(|n| n == key.sub_route);
    let direction_matches = item
        .direction
        .is_none_or(|d| d == i64::from(key.direction.code()));
    name_matches && direction_matches
}

/// Convert an ETA response into an ordered snapshot for `key`.
///
/// Records are ordered by `StopSequence` when every record carries one,
/// otherwise feed order is kept. A stop listed twice keeps its first record.
pub fn convert_estimates(
    key: &RouteKey,
    items: &[EstimateDto],
) -> Result<LiveSnapshot, ConversionError> {
    let mut relevant: Vec<&EstimateDto> = items.iter().filter(|i| belongs_to(i, key)).collect();

    if relevant.iter().all(|i| i.stop_sequence.is_some()) {
        relevant.sort_by_key(|i| i.stop_sequence);
    }

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(relevant.len());
    for item in relevant {
        let record = convert_estimate(item)?;
        if seen.insert(record.stop.uid.clone()) {
            records.push(record);
        }
    }

    Ok(LiveSnapshot::new(key.clone(), records))
}
