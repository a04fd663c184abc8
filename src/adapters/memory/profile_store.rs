//! In-memory profile store.
//!
//! Backs the service when no database is configured in development, and
//! the handler tests everywhere. Mirrors the PostgreSQL store's rules: one
//! profile per user, and a subscription id bound to at most one profile.
//! Nothing persists across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::billing::{Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId};
use crate::ports::ProfileStore;

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `profiles`, replacing any with the same user.
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        {
            let mut map = store.write();
            for profile in profiles {
                map.insert(profile.user_id.clone(), profile);
            }
        }
        store
    }

    /// Current profile for `user_id`, bypassing the port.
    pub fn get(&self, user_id: &UserId) -> Option<Profile> {
        self.read().get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, Profile>> {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserId, Profile>> {
        self.profiles.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn user_for_subscription(
    profiles: &HashMap<UserId, Profile>,
    subscription_id: &SubscriptionId,
) -> Option<UserId> {
    profiles
        .values()
        .find(|p| p.stripe_subscription_id.as_ref() == Some(subscription_id))
        .map(|p| p.user_id.clone())
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(self.get(user_id))
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Profile>, DomainError> {
        let profiles = self.read();
        Ok(user_for_subscription(&profiles, subscription_id)
            .and_then(|user_id| profiles.get(&user_id).cloned()))
    }

    async fn update(
        &self,
        key: &ProfileKey,
        update: &ProfileUpdate,
    ) -> Result<Profile, DomainError> {
        let mut profiles = self.write();

        let user_id = match key {
            ProfileKey::UserId(id) => profiles.contains_key(id).then(|| id.clone()),
            ProfileKey::SubscriptionId(id) => user_for_subscription(&profiles, id),
        }
        .ok_or_else(|| {
            DomainError::new(ErrorCode::ProfileNotFound, format!("No profile for {}", key))
        })?;

        if let Some(Some(new_sub)) = &update.stripe_subscription_id {
            if let Some(owner) = user_for_subscription(&profiles, new_sub) {
                if owner != user_id {
                    return Err(DomainError::database(
                        "Subscription is already bound to another profile",
                    ));
                }
            }
        }

        let profile = profiles.get_mut(&user_id).ok_or_else(|| {
            DomainError::new(ErrorCode::ProfileNotFound, format!("No profile for {}", key))
        })?;
        profile.apply(update);
        Ok(profile.clone())
    }

    async fn create(&self, profile: &Profile) -> Result<(), DomainError> {
        let mut profiles = self.write();
        if profiles.contains_key(&profile.user_id) {
            return Err(DomainError::new(
                ErrorCode::ProfileExists,
                format!("Profile already exists for user {}", profile.user_id),
            ));
        }
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanType;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn sub(id: &str) -> SubscriptionId {
        SubscriptionId::new(id).unwrap()
    }

    fn subscribed(user_id: &str, sub_id: &str) -> Profile {
        let mut profile = Profile::new(user(user_id));
        profile.apply(&ProfileUpdate::activated(sub(sub_id), Some(PlanType::Monthly)));
        profile
    }

    #[tokio::test]
    async fn create_then_find_by_user() {
        let store = InMemoryProfileStore::new();
        store.create(&Profile::new(user("u1"))).await.unwrap();

        let found = store.find_by_user_id(&user("u1")).await.unwrap();
        assert_eq!(found.map(|p| p.user_id), Some(user("u1")));
        assert!(store.find_by_user_id(&user("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_twice_fails_with_profile_exists() {
        let store = InMemoryProfileStore::new();
        store.create(&Profile::new(user("u1"))).await.unwrap();

        let err = store.create(&Profile::new(user("u1"))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileExists);
    }

    #[tokio::test]
    async fn find_by_subscription_scans_profiles() {
        let store = InMemoryProfileStore::with_profiles([
            Profile::new(user("u1")),
            subscribed("u2", "sub_2"),
        ]);

        let found = store.find_by_subscription_id(&sub("sub_2")).await.unwrap();
        assert_eq!(found.map(|p| p.user_id), Some(user("u2")));
        assert!(store.find_by_subscription_id(&sub("sub_x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_by_subscription_changes_only_named_fields() {
        let store = InMemoryProfileStore::with_profiles([subscribed("u1", "sub_1")]);

        let updated = store
            .update(&ProfileKey::from(sub("sub_1")), &ProfileUpdate::deactivated())
            .await
            .unwrap();

        assert!(!updated.subscription_active);
        assert_eq!(updated.stripe_subscription_id, Some(sub("sub_1")));
        assert_eq!(updated.subscription_tier, Some(PlanType::Monthly));
        assert_eq!(store.get(&user("u1")), Some(updated));
    }

    #[tokio::test]
    async fn update_missing_profile_is_not_found() {
        let store = InMemoryProfileStore::new();

        let err = store
            .update(&ProfileKey::from(user("ghost")), &ProfileUpdate::cleared())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileNotFound);

        let err = store
            .update(&ProfileKey::from(sub("sub_x")), &ProfileUpdate::deactivated())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileNotFound);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn subscription_cannot_be_bound_twice() {
        let store = InMemoryProfileStore::with_profiles([
            subscribed("u1", "sub_1"),
            Profile::new(user("u2")),
        ]);

        let err = store
            .update(
                &ProfileKey::from(user("u2")),
                &ProfileUpdate::activated(sub("sub_1"), None),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!store.get(&user("u2")).unwrap().has_subscription());
    }

    #[tokio::test]
    async fn rebinding_own_subscription_is_allowed() {
        let store = InMemoryProfileStore::with_profiles([subscribed("u1", "sub_1")]);

        let updated = store
            .update(
                &ProfileKey::from(user("u1")),
                &ProfileUpdate::activated(sub("sub_1"), Some(PlanType::Yearly)),
            )
            .await
            .unwrap();
        assert_eq!(updated.subscription_tier, Some(PlanType::Yearly));
        assert_eq!(store.len(), 1);
    }
}
