//! Domain types for the bus arrival notifier.
//!
//! Everything here is validated at construction, so the proximity logic and
//! poll loop can trust the values they receive. Raw feed data is converted
//! into these types at the source boundary.

mod error;
mod event;
mod live;
mod route;
mod stop;
mod subscription;

pub use error::DomainError;
pub use event::{Distance, NotificationEvent};
pub use live::{LiveSnapshot, LiveStopRecord, StopStatus};
pub use route::{Direction, RouteInfo, RouteKey, SubRoute};
pub use stop::{Name, Stop, StopSequence, StopUid};
pub use subscription::{InvalidUserId, Subscription, UserId};
