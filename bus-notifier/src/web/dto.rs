//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, RouteInfo, Subscription};

/// Request to add a subscription.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    /// Route name, e.g. "672"
    pub route_name: String,

    /// Sub-route name (defaults to the route name)
    pub sub_route_name: Option<String>,

    /// 0 outbound, 1 inbound
    pub direction: Direction,

    /// Stop to be notified about, by its Chinese name
    pub target_stop: String,
}

impl SubscribeRequest {
    pub fn into_subscription(self) -> Subscription {
        let sub_route = self
            .sub_route_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.route_name.clone());
        Subscription::new(self.route_name, sub_route, self.direction, self.target_stop)
    }
}

/// A stored subscription with its position.
#[derive(Debug, Serialize, PartialEq)]
pub struct SubscriptionView {
    /// Position in the user's list; used to unsubscribe
    pub index: usize,
    pub route_name: String,
    pub sub_route_name: String,
    pub direction: Direction,
    pub target_stop: String,
}

impl SubscriptionView {
    pub fn new(index: usize, sub: Subscription) -> Self {
        Self {
            index,
            route_name: sub.route,
            sub_route_name: sub.sub_route,
            direction: sub.direction,
            target_stop: sub.target_stop,
        }
    }
}

/// A user's subscriptions.
#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub user: String,
    pub subscriptions: Vec<SubscriptionView>,
}

/// A route in the catalog listing.
#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub name_en: Option<String>,
    pub departure_stop: String,
    pub destination_stop: String,
    pub sub_routes: Vec<SubRouteSummary>,
}

/// One direction of a route.
#[derive(Debug, Serialize)]
pub struct SubRouteSummary {
    pub name: String,
    pub direction: Direction,
    /// Terminal the bus heads to in this direction
    pub heading_to: String,
}

impl From<RouteInfo> for RouteSummary {
    fn from(info: RouteInfo) -> Self {
        let sub_routes = info
            .sub_routes
            .values()
            .map(|sub| SubRouteSummary {
                name: sub.name.zh_tw.clone(),
                direction: sub.direction,
                heading_to: info.terminal_for(sub.direction).to_string(),
            })
            .collect();

        Self {
            name: info.name.zh_tw,
            name_en: info.name.en,
            departure_stop: info.departure_stop,
            destination_stop: info.destination_stop,
            sub_routes,
        }
    }
}

/// Route listing response.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<RouteSummary>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
