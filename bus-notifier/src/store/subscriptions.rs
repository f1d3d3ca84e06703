//! Validated subscription management over a store.

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::{RouteCatalog, ValidationError};
use crate::domain::{Subscription, UserId};

use super::SubscriptionStore;
use super::error::StoreError;

/// Error from subscribing or unsubscribing.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The route or sub-route is not in the catalog
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No subscription at that position
    #[error("user {user} has no subscription #{index}")]
    NotFound { user: UserId, index: usize },

    /// The store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Subscription operations, validated against the route catalog.
pub struct Subscriptions<S> {
    store: S,
    catalog: RouteCatalog,
    // Serializes load-modify-save so concurrent writers cannot drop entries.
    write_lock: Mutex<()>,
}

impl<S: SubscriptionStore> Subscriptions<S> {
    pub fn new(store: S, catalog: RouteCatalog) -> Self {
        Self {
            store,
            catalog,
            write_lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    /// Add a subscription after checking its route and sub-route exist.
    ///
    /// The record is saved before this returns. On a validation failure
    /// nothing is written.
    pub async fn subscribe(
        &self,
        user: &UserId,
        subscription: Subscription,
    ) -> Result<(), SubscribeError> {
        self.catalog
            .validate(
                &subscription.route,
                &subscription.sub_route,
                subscription.direction,
            )
            .await?;

        let _guard = self.write_lock.lock().await;
        let mut current = self.store.load(user).await?;
        info!(
            user = %user,
            route = %subscription.route_key(),
            stop = %subscription.target_stop,
            "Adding subscription"
        );
        current.push(subscription);
        self.store.save(user, &current).await?;
        Ok(())
    }

    /// A user's subscriptions in insertion order.
    pub async fn list(&self, user: &UserId) -> Result<Vec<Subscription>, SubscribeError> {
        Ok(self.store.load(user).await?)
    }

    /// Remove the subscription at `index` (as returned by `list`).
    pub async fn unsubscribe(
        &self,
        user: &UserId,
        index: usize,
    ) -> Result<Subscription, SubscribeError> {
        let _guard = self.write_lock.lock().await;
        let mut current = self.store.load(user).await?;
        if index >= current.len() {
            return Err(SubscribeError::NotFound {
                user: user.clone(),
                index,
            });
        }
        let removed = current.remove(index);
        self.store.save(user, &current).await?;
        info!(user = %user, route = %removed.route_key(), "Removed subscription");
        Ok(removed)
    }

    /// Every user's subscriptions.
    ///
    /// A user whose record cannot be read is logged and skipped so one bad
    /// record does not stop everyone else's notifications.
    pub async fn all(&self) -> Result<Vec<(UserId, Vec<Subscription>)>, StoreError> {
        let users = self.store.list_users().await?;
        let mut all = Vec::with_capacity(users.len());
        for user in users {
            match self.store.load(&user).await {
                Ok(subs) if subs.is_empty() => {}
                Ok(subs) => all.push((user, subs)),
                Err(e) => warn!(user = %user, error = %e, "Skipping unreadable subscriptions"),
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Name, RouteInfo, SubRoute};
    use crate::store::MemoryStore;

    fn catalog() -> RouteCatalog {
        let sub = SubRoute {
            uid: "TPE157462".into(),
            name: Name::zh("672"),
            direction: Direction::Inbound,
        };
        RouteCatalog::from_routes([RouteInfo {
            uid: "TPE15746".into(),
            id: "15746".into(),
            name: Name::zh("672"),
            departure_stop: "大鵬新城".into(),
            destination_stop: "博仁醫院".into(),
            sub_routes: [(("672".to_string(), Direction::Inbound), sub)]
                .into_iter()
                .collect(),
        }])
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn subs() -> Subscriptions<MemoryStore> {
        Subscriptions::new(MemoryStore::new(), catalog())
    }

    #[tokio::test]
    async fn subscribe_appends_in_order() {
        let subs = subs();
        let u = user("user1");
        let first = Subscription::new("672", "672", Direction::Inbound, "博仁醫院");
        let second = Subscription::new("672", "672", Direction::Inbound, "捷運景平站");

        subs.subscribe(&u, first.clone()).await.unwrap();
        subs.subscribe(&u, second.clone()).await.unwrap();

        assert_eq!(subs.list(&u).await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn unknown_route_leaves_store_unchanged() {
        let subs = subs();
        let u = user("user1");
        subs.subscribe(&u, Subscription::new("672", "672", Direction::Inbound, "A"))
            .await
            .unwrap();
        let before = subs.list(&u).await.unwrap().len();

        let err = subs
            .subscribe(&u, Subscription::new("999", "999", Direction::Inbound, "A"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscribeError::Validation(ValidationError::UnknownRoute(_))
        ));
        assert_eq!(subs.list(&u).await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn unknown_direction_is_rejected() {
        let subs = subs();
        let u = user("user2");
        let err = subs
            .subscribe(&u, Subscription::new("672", "672", Direction::Outbound, "A"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscribeError::Validation(ValidationError::UnknownSubRoute { .. })
        ));
        assert!(subs.list(&u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_by_index() {
        let subs = subs();
        let u = user("user1");
        for stop in ["A", "B", "C"] {
            subs.subscribe(&u, Subscription::new("672", "672", Direction::Inbound, stop))
                .await
                .unwrap();
        }

        let removed = subs.unsubscribe(&u, 1).await.unwrap();
        assert_eq!(removed.target_stop, "B");

        let remaining: Vec<_> = subs
            .list(&u)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.target_stop)
            .collect();
        assert_eq!(remaining, vec!["A", "C"]);

        assert!(matches!(
            subs.unsubscribe(&u, 5).await,
            Err(SubscribeError::NotFound { index: 5, .. })
        ));
    }

    #[tokio::test]
    async fn all_skips_users_without_subscriptions() {
        let subs = subs();
        subs.subscribe(
            &user("a"),
            Subscription::new("672", "672", Direction::Inbound, "A"),
        )
        .await
        .unwrap();
        subs.subscribe(
            &user("b"),
            Subscription::new("672", "672", Direction::Inbound, "B"),
        )
        .await
        .unwrap();
        subs.unsubscribe(&user("b"), 0).await.unwrap();

        let all = subs.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, user("a"));
    }
}
