//! In-memory subscription store.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Subscription, UserId};

use super::SubscriptionStore;
use super::error::StoreError;

/// Volatile store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<UserId, Vec<Subscription>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn load(&self, user: &UserId) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, user: &UserId, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(user.clone(), subscriptions.to_vec());
        Ok(())
    }
}
