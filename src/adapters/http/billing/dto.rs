//! HTTP DTOs for billing endpoints.
//!
//! Field names are camelCase to match the web client.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{Plan, Profile};
use crate::ports::SubscriptionSnapshot;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/checkout`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// `weekly`, `monthly` or `yearly`.
    #[serde(default)]
    pub plan_type: String,
    /// Must match the session user when present.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the session email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /api/profile/change-plan`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    #[serde(default)]
    pub new_plan: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page to redirect the browser to.
    pub url: String,
}

/// Subscription fields of the caller's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub subscription_tier: Option<String>,
    pub subscription_active: bool,
    pub stripe_subscription_id: Option<String>,
}

impl From<&Profile> for SubscriptionStatus {
    fn from(profile: &Profile) -> Self {
        Self {
            subscription_tier: profile.subscription_tier.map(|t| t.as_str().to_string()),
            subscription_active: profile.subscription_active,
            stripe_subscription_id: profile
                .stripe_subscription_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
        }
    }
}

/// `{"subscription": {...}}` for profile-backed endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub subscription: SubscriptionStatus,
}

impl From<&Profile> for SubscriptionStatusResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            subscription: SubscriptionStatus::from(profile),
        }
    }
}

/// Processor-side view of a subscription after cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSubscription {
    pub id: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    /// RFC 3339
    pub current_period_end: Option<String>,
}

impl From<&SubscriptionSnapshot> for ProcessorSubscription {
    fn from(snapshot: &SubscriptionSnapshot) -> Self {
        Self {
            id: snapshot.id.as_str().to_string(),
            status: snapshot.status.clone(),
            cancel_at_period_end: snapshot.cancel_at_period_end,
            current_period_end: snapshot
                .current_period_end
                .as_ref()
                .map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// Response of `POST /api/profile/unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeResponse {
    pub subscription: ProcessorSubscription,
}

/// One entry of `GET /api/plans`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub plan_type: String,
    pub name: String,
    /// Major currency units, e.g. `9.99`.
    pub amount: f64,
    pub currency: String,
    pub interval: String,
    pub description: String,
    pub features: Vec<String>,
    pub is_popular: bool,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            plan_type: plan.plan_type.as_str().to_string(),
            name: plan.name.clone(),
            amount: plan.amount(),
            currency: plan.currency.clone(),
            interval: plan.interval.clone(),
            description: plan.description.clone(),
            features: plan.features.clone(),
            is_popular: plan.is_popular,
        }
    }
}
