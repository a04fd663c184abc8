//! Profile store port.
//!
//! Persistent per-user subscription records. Two lookup paths exist on
//! purpose: user commands know the user id, processor webhooks only know
//! the subscription id.
//!
//! The store does not order concurrent updates to the same profile; the
//! last write wins.

use async_trait::async_trait;

use crate::domain::billing::{Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::{DomainError, SubscriptionId, UserId};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Find a profile by its owner.
    ///
    /// Returns `None` if the user has no profile.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Find the profile currently bound to a processor subscription.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn find_by_subscription_id(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Profile>, DomainError>;

    /// Apply a partial update and return the resulting profile.
    ///
    /// Only fields named in `update` change.
    ///
    /// # Errors
    ///
    /// - `ProfileNotFound` if no profile matches `key`
    /// - `DatabaseError` on persistence failure
    async fn update(&self, key: &ProfileKey, update: &ProfileUpdate)
        -> Result<Profile, DomainError>;

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// - `ProfileExists` if the user already has one
    /// - `DatabaseError` on persistence failure
    async fn create(&self, profile: &Profile) -> Result<(), DomainError>;
}
