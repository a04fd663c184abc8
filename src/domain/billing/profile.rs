//! Profile entity and partial updates.
//!
//! A Profile is the local record of one user's subscription state. It is
//! written from two directions: user commands (keyed by user id) and
//! processor webhooks (keyed by subscription id). Every transition is a
//! plain field assignment, so replaying an update converges to the same
//! state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

use super::PlanType;

/// Per-user subscription record.
///
/// # Invariants
///
/// - `subscription_active` implies `stripe_subscription_id.is_some()`
/// - a tier without a subscription id is transient and is corrected by a
///   later event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,

    /// Reference to the processor's subscription; `None` means none known.
    pub stripe_subscription_id: Option<SubscriptionId>,

    pub subscription_tier: Option<PlanType>,

    /// True while the processor considers the subscription in good standing.
    pub subscription_active: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Profile {
    /// Creates an unsubscribed profile.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            stripe_subscription_id: None,
            subscription_tier: None,
            subscription_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a profile from stored fields without touching timestamps.
    pub fn reconstitute(
        user_id: UserId,
        stripe_subscription_id: Option<SubscriptionId>,
        subscription_tier: Option<PlanType>,
        subscription_active: bool,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            stripe_subscription_id,
            subscription_tier,
            subscription_active,
            created_at,
            updated_at,
        }
    }

    pub fn has_subscription(&self) -> bool {
        self.stripe_subscription_id.is_some()
    }

    /// Checks the stored-state invariants.
    ///
    /// A tier without a subscription id is tolerated as transient; an active
    /// flag without one is not.
    pub fn is_consistent(&self) -> bool {
        !self.subscription_active || self.stripe_subscription_id.is_some()
    }

    /// Applies a partial update. Only fields named in `update` change.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(id) = &update.stripe_subscription_id {
            self.stripe_subscription_id = id.clone();
        }
        if let Some(tier) = update.subscription_tier {
            self.subscription_tier = tier;
        }
        if let Some(active) = update.subscription_active {
            self.subscription_active = active;
        }
        self.updated_at = Timestamp::now();
    }
}

/// Partial set of profile fields to overwrite.
///
/// The outer `Option` says whether the field is touched; the inner one is
/// the new (nullable) value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub stripe_subscription_id: Option<Option<SubscriptionId>>,
    pub subscription_tier: Option<Option<PlanType>>,
    pub subscription_active: Option<bool>,
}

impl ProfileUpdate {
    /// Checkout completed: bind the subscription and mark it active.
    pub fn activated(subscription_id: SubscriptionId, tier: Option<PlanType>) -> Self {
        Self {
            stripe_subscription_id: Some(Some(subscription_id)),
            subscription_tier: Some(tier),
            subscription_active: Some(true),
        }
    }

    /// Payment failed: deactivate but keep the subscription and tier.
    pub fn deactivated() -> Self {
        Self {
            subscription_active: Some(false),
            ..Default::default()
        }
    }

    /// Subscription ended or was canceled: clear every subscription field.
    pub fn cleared() -> Self {
        Self {
            stripe_subscription_id: Some(None),
            subscription_tier: Some(None),
            subscription_active: Some(false),
        }
    }

    /// Plan change on an existing subscription.
    pub fn tier_changed(tier: PlanType) -> Self {
        Self {
            subscription_tier: Some(Some(tier)),
            ..Default::default()
        }
    }
}

/// How a profile is addressed: by owner or by processor subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProfileKey {
    UserId(UserId),
    SubscriptionId(SubscriptionId),
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKey::UserId(id) => write!(f, "user {}", id),
            ProfileKey::SubscriptionId(id) => write!(f, "subscription {}", id),
        }
    }
}

impl From<UserId> for ProfileKey {
    fn from(id: UserId) -> Self {
        ProfileKey::UserId(id)
    }
}

impl From<SubscriptionId> for ProfileKey {
    fn from(id: SubscriptionId) -> Self {
        ProfileKey::SubscriptionId(id)
    }
}
