//! CreateProfileHandler - Ensures the caller has a profile.
//!
//! Idempotent: an existing profile is returned unchanged.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Profile};
use crate::domain::foundation::{ErrorCode, UserId};
use crate::ports::ProfileStore;

#[derive(Debug, Clone)]
pub struct CreateProfileCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CreateProfileResult {
    pub profile: Profile,
    /// False when the profile already existed.
    pub created: bool,
}

pub struct CreateProfileHandler {
    store: Arc<dyn ProfileStore>,
}

impl CreateProfileHandler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: CreateProfileCommand,
    ) -> Result<CreateProfileResult, BillingError> {
        if let Some(profile) = self.store.find_by_user_id(&cmd.user_id).await? {
            return Ok(CreateProfileResult {
                profile,
                created: false,
            });
        }

        let profile = Profile::new(cmd.user_id.clone());
        match self.store.create(&profile).await {
            Ok(()) => {
                tracing::info!(user_id = %cmd.user_id, "Profile created");
                Ok(CreateProfileResult {
                    profile,
                    created: true,
                })
            }
            // Lost a race with a concurrent create
            Err(err) if err.code == ErrorCode::ProfileExists => {
                let profile = self
                    .store
                    .find_by_user_id(&cmd.user_id)
                    .await?
                    .ok_or_else(|| BillingError::profile_not_found_for_user(&cmd.user_id))?;
                Ok(CreateProfileResult {
                    profile,
                    created: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProfileStore;
    use crate::domain::billing::{PlanType, ProfileUpdate};
    use crate::domain::foundation::SubscriptionId;

    fn command() -> CreateProfileCommand {
        CreateProfileCommand {
            user_id: UserId::new("u1").unwrap(),
        }
    }

    #[tokio::test]
    async fn creates_unsubscribed_profile() {
        let store = Arc::new(InMemoryProfileStore::new());

        let result = CreateProfileHandler::new(store.clone())
            .handle(command())
            .await
            .unwrap();

        assert!(result.created);
        assert!(!result.profile.has_subscription());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn existing_profile_is_returned_unchanged() {
        let mut existing = Profile::new(UserId::new("u1").unwrap());
        existing.apply(&ProfileUpdate::activated(
            SubscriptionId::new("sub_1").unwrap(),
            Some(PlanType::Weekly),
        ));
        let store = Arc::new(InMemoryProfileStore::with_profiles([existing.clone()]));

        let result = CreateProfileHandler::new(store)
            .handle(command())
            .await
            .unwrap();

        assert!(!result.created);
        assert_eq!(result.profile, existing);
    }
}
