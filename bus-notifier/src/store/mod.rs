//! Subscription storage.
//!
//! The store is a plain record-per-user interface: list users, load one
//! user's list, replace one user's list. Validation and ordering rules live
//! in [`Subscriptions`], so backends stay swappable.

mod error;
mod file;
mod memory;
mod subscriptions;

use std::future::Future;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use subscriptions::{SubscribeError, Subscriptions};

use crate::domain::{Subscription, UserId};

/// Durable per-user subscription records.
///
/// `save` replaces the user's whole record; there are no partial updates.
pub trait SubscriptionStore: Send + Sync {
    /// Every user with a stored record.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;

    /// A user's subscriptions in insertion order. Unknown users have none.
    fn load(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Subscription>, StoreError>> + Send;

    /// Replace a user's subscriptions.
    fn save(
        &self,
        user: &UserId,
        subscriptions: &[Subscription],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The store selected at startup.
#[derive(Debug, Clone)]
pub enum AnyStore {
    File(JsonFileStore),
    Memory(MemoryStore),
}

impl SubscriptionStore for AnyStore {
    async fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        match self {
            AnyStore::File(s) => s.list_users().await,
            AnyStore::Memory(s) => s.list_users().await,
        }
    }

    async fn load(&self, user: &UserId) -> Result<Vec<Subscription>, StoreError> {
        match self {
            AnyStore::File(s) => s.load(user).await,
            AnyStore::Memory(s) => s.load(user).await,
        }
    }

    async fn save(&self, user: &UserId, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        match self {
            AnyStore::File(s) => s.save(user, subscriptions).await,
            AnyStore::Memory(s) => s.save(user, subscriptions).await,
        }
    }
}
