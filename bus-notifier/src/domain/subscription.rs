//! Users and their stop subscriptions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Direction, RouteKey};

/// Error returned when parsing an invalid user id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid user id: {reason}")]
pub struct InvalidUserId {
    reason: &'static str,
}

/// Identifier of a subscribed user.
///
/// User ids name per-user records in the file store, so they are limited to
/// ASCII letters, digits, `-` and `_`.
///
/// # Examples
///
/// ```
/// use bus_notifier::domain::UserId;
///
/// assert!(UserId::parse("user1").is_ok());
/// assert!(UserId::parse("").is_err());
/// assert!(UserId::parse("../etc").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    const MAX_LEN: usize = 64;

    pub fn parse(s: &str) -> Result<Self, InvalidUserId> {
        if s.is_empty() {
            return Err(InvalidUserId {
                reason: "must not be empty",
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(InvalidUserId {
                reason: "must be at most 64 characters",
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(InvalidUserId {
                reason: "must contain only ASCII letters, digits, '-' or '_'",
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's request to be told when a bus nears `target_stop`.
///
/// The user id is not stored in the record itself: records live under
/// their owner in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "route_name")]
    pub route: String,
    #[serde(rename = "sub_route_name")]
    pub sub_route: String,
    pub direction: Direction,
    pub target_stop: String,
}

impl Subscription {
    pub fn new(
        route: impl Into<String>,
        sub_route: impl Into<String>,
        direction: Direction,
        target_stop: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            sub_route: sub_route.into(),
            direction,
            target_stop: target_stop.into(),
        }
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(self.route.clone(), self.sub_route.clone(), self.direction)
    }
}
