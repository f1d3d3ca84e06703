//! Application state for the web layer.

use std::sync::Arc;

use crate::catalog::RouteCatalog;
use crate::store::{AnyStore, Subscriptions};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Subscription operations, shared with the poll loop
    pub subscriptions: Arc<Subscriptions<AnyStore>>,
}

impl AppState {
    pub fn new(subscriptions: Arc<Subscriptions<AnyStore>>) -> Self {
        Self { subscriptions }
    }

    pub fn catalog(&self) -> &RouteCatalog {
        self.subscriptions.catalog()
    }
}
