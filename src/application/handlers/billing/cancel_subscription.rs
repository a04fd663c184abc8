//! CancelSubscriptionHandler - Stops renewal and clears the local record.
//!
//! The processor is asked to cancel at period end, then the profile is
//! cleared immediately, ahead of the processor's own confirmation event.
//! Events for the old subscription that arrive afterwards no longer match
//! any profile and are dropped by the webhook handler.
//!
//! There is no rollback: if the local write fails after the processor
//! accepted the cancel, only a later webhook repairs the drift.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentGateway, ProfileStore, SubscriptionSnapshot};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    /// Processor view after the cancel request.
    pub subscription: SubscriptionSnapshot,
    /// Local profile after clearing.
    pub profile: Profile,
}

pub struct CancelSubscriptionHandler {
    store: Arc<dyn ProfileStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CancelSubscriptionHandler {
    pub fn new(store: Arc<dyn ProfileStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        // 1. Find the caller's subscription
        let profile = self
            .store
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::profile_not_found_for_user(&cmd.user_id))?;

        let subscription_id = profile
            .stripe_subscription_id
            .ok_or_else(|| BillingError::no_active_subscription(cmd.user_id.clone()))?;

        // 2. Processor first
        let subscription = self
            .gateway
            .cancel_at_period_end(&subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Cancel at period end failed"
                );
                BillingError::from(e)
            })?;

        // 3. Optimistic local clear
        let profile = self
            .store
            .update(&ProfileKey::from(cmd.user_id.clone()), &ProfileUpdate::cleared())
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Processor canceled but local profile was not cleared"
                );
                BillingError::from(e)
            })?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            "Subscription canceled at period end"
        );

        Ok(CancelSubscriptionResult {
            subscription,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProfileStore;
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::application::handlers::billing::{
        HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome,
    };
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::SubscriptionId;
    use crate::ports::GatewayError;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn subscribed(user_id: &str, sub_id: &str) -> Profile {
        let mut profile = Profile::new(user(user_id));
        profile.apply(&ProfileUpdate::activated(
            SubscriptionId::new(sub_id).unwrap(),
            Some(PlanType::Monthly),
        ));
        profile
    }

    fn command() -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            user_id: user("u1"),
        }
    }

    #[tokio::test]
    async fn cancels_at_processor_and_clears_profile() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([subscribed("u1", "sub_1")]));
        let gateway = MockPaymentGateway::new();
        let handler = CancelSubscriptionHandler::new(store.clone(), Arc::new(gateway.clone()));

        let result = handler.handle(command()).await.unwrap();

        assert!(result.subscription.cancel_at_period_end);
        assert_eq!(result.subscription.id.as_str(), "sub_1");
        assert_eq!(gateway.calls()[0].args, vec!["sub_1".to_string()]);

        let profile = store.get(&user("u1")).unwrap();
        assert!(!profile.has_subscription());
        assert!(!profile.subscription_active);
        assert_eq!(profile.subscription_tier, None);
        assert_eq!(result.profile, profile);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = Arc::new(InMemoryProfileStore::new());
        let gateway = MockPaymentGateway::new();
        let handler = CancelSubscriptionHandler::new(store, Arc::new(gateway.clone()));

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(err, BillingError::ProfileNotFound(_)));
        assert!(!gateway.was_called("cancel_at_period_end"));
    }

    #[tokio::test]
    async fn profile_without_subscription_is_rejected() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([Profile::new(user("u1"))]));
        let gateway = MockPaymentGateway::new();
        let handler = CancelSubscriptionHandler::new(store, Arc::new(gateway.clone()));

        let err = handler.handle(command()).await.unwrap_err();

        assert_eq!(err, BillingError::no_active_subscription(user("u1")));
        assert!(!gateway.was_called("cancel_at_period_end"));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_profile_untouched() {
        let before = subscribed("u1", "sub_1");
        let store = Arc::new(InMemoryProfileStore::with_profiles([before.clone()]));
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("cancel_at_period_end", GatewayError::not_found("Subscription"));
        let handler = CancelSubscriptionHandler::new(store.clone(), Arc::new(gateway));

        let err = handler.handle(command()).await.unwrap_err();

        assert!(matches!(err, BillingError::SubscriptionNotFound(_)));
        assert_eq!(store.get(&user("u1")), Some(before));
    }

    #[tokio::test]
    async fn stale_event_after_cancel_is_dropped() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([subscribed("u1", "sub_1")]));
        let gateway = MockPaymentGateway::new()
            .with_event(MockPaymentGateway::payment_failed_event("sub_1"));
        let cancel = CancelSubscriptionHandler::new(store.clone(), Arc::new(gateway.clone()));
        let webhook = HandleWebhookHandler::new(store.clone(), Arc::new(gateway));

        cancel.handle(command()).await.unwrap();
        let after_cancel = store.get(&user("u1")).unwrap();

        let outcome = webhook
            .handle(HandleWebhookCommand {
                payload: b"{}".to_vec(),
                signature: "t=1,v1=aa".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Skipped { .. }));
        assert_eq!(store.get(&user("u1")), Some(after_cancel));
    }
}
