//! Route, sub-route and direction types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DomainError, Name};

/// Travel direction of a sub-route, using TDX's 0/1 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum Direction {
    /// Code 0: towards the route's destination terminal.
    Outbound,
    /// Code 1: back towards the departure terminal.
    Inbound,
}

impl Direction {
    /// Decode a TDX direction code.
    pub fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            0 => Ok(Direction::Outbound),
            1 => Ok(Direction::Inbound),
            other => Err(DomainError::InvalidDirection(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Direction::Outbound => 0,
            Direction::Inbound => 1,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = DomainError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<Direction> for u8 {
    fn from(d: Direction) -> Self {
        d.code()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The (route, sub-route, direction) tuple that identifies one live feed.
///
/// This is the unit of fetching and caching: every subscriber watching the
/// same key shares a single snapshot per poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub route: String,
    pub sub_route: String,
    pub direction: Direction,
}

impl RouteKey {
    pub fn new(route: impl Into<String>, sub_route: impl Into<String>, direction: Direction) -> Self {
        Self {
            route: route.into(),
            sub_route: sub_route.into(),
            direction,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.route, self.sub_route, self.direction)
    }
}

/// A directional branch of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRoute {
    pub uid: String,
    pub name: Name,
    pub direction: Direction,
}

/// Catalog entry for a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub uid: String,
    pub id: String,
    pub name: Name,
    pub departure_stop: String,
    pub destination_stop: String,
    /// Sub-routes keyed by (sub-route name, direction).
    #[serde(with = "sub_route_map")]
    pub sub_routes: BTreeMap<(String, Direction), SubRoute>,
}

impl RouteInfo {
    pub fn has_sub_route(&self, sub_route: &str, direction: Direction) -> bool {
        self.sub_routes
            .contains_key(&(sub_route.to_string(), direction))
    }

    /// Terminal the bus is heading to when travelling in `direction`.
    pub fn terminal_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::Outbound => &self.destination_stop,
            Direction::Inbound => &self.departure_stop,
        }
    }
}

/// JSON object keys must be strings, so the tuple-keyed map is written as a list.
mod sub_route_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Direction, SubRoute};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<(String, Direction), SubRoute>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.values().collect::<Vec<_>>().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(String, Direction), SubRoute>, D::Error> {
        let list = Vec::<SubRoute>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|s| ((s.name.zh_tw.clone(), s.direction), s))
            .collect())
    }
}
