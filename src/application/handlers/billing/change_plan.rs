//! ChangePlanHandler - Moves an existing subscription to another plan.
//!
//! Never creates a subscription. The processor swaps the price on the
//! subscription's single item (with prorations), then the local tier is
//! updated. Same no-rollback rule as cancellation.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog, Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentGateway, ProfileStore, SubscriptionSnapshot};

#[derive(Debug, Clone)]
pub struct ChangePlanCommand {
    pub user_id: UserId,
    /// Raw plan selector from the client.
    pub new_plan: String,
}

#[derive(Debug, Clone)]
pub struct ChangePlanResult {
    pub subscription: SubscriptionSnapshot,
    pub profile: Profile,
}

pub struct ChangePlanHandler {
    store: Arc<dyn ProfileStore>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<PlanCatalog>,
}

impl ChangePlanHandler {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
        }
    }

    pub async fn handle(&self, cmd: ChangePlanCommand) -> Result<ChangePlanResult, BillingError> {
        let plan = self.catalog.resolve(&cmd.new_plan)?;

        let profile = self
            .store
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::profile_not_found_for_user(&cmd.user_id))?;
        let subscription_id = profile
            .stripe_subscription_id
            .ok_or_else(|| BillingError::no_active_subscription(cmd.user_id.clone()))?;

        let subscription = self
            .gateway
            .update_subscription_plan(&subscription_id, &plan.price_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Plan change failed"
                );
                BillingError::from(e)
            })?;

        let profile = self
            .store
            .update(
                &ProfileKey::from(cmd.user_id.clone()),
                &ProfileUpdate::tier_changed(plan.plan_type),
            )
            .await?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            plan_type = %plan.plan_type,
            "Subscription plan changed"
        );

        Ok(ChangePlanResult {
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
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::SubscriptionId;
    use crate::ports::GatewayError;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn subscribed() -> Profile {
        let mut profile = Profile::new(user());
        profile.apply(&ProfileUpdate::activated(
            SubscriptionId::new("sub_1").unwrap(),
            Some(PlanType::Monthly),
        ));
        profile
    }

    fn handler(store: Arc<InMemoryProfileStore>, gateway: &MockPaymentGateway) -> ChangePlanHandler {
        ChangePlanHandler::new(
            store,
            Arc::new(gateway.clone()),
            Arc::new(PlanCatalog::default()),
        )
    }

    fn command(plan: &str) -> ChangePlanCommand {
        ChangePlanCommand {
            user_id: user(),
            new_plan: plan.to_string(),
        }
    }

    #[tokio::test]
    async fn swaps_price_then_updates_tier() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([subscribed()]));
        let gateway = MockPaymentGateway::new();

        let result = handler(store.clone(), &gateway)
            .handle(command("yearly"))
            .await
            .unwrap();

        assert_eq!(result.subscription.price_id.as_deref(), Some("price_yearly"));
        let profile = store.get(&user()).unwrap();
        assert_eq!(profile.subscription_tier, Some(PlanType::Yearly));
        assert_eq!(profile.stripe_subscription_id, subscribed().stripe_subscription_id);
        assert!(profile.subscription_active);
        assert_eq!(gateway.call_count("update_subscription_plan"), 1);
    }

    #[tokio::test]
    async fn unknown_plan_is_rejected() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([subscribed()]));
        let gateway = MockPaymentGateway::new();

        let err = handler(store, &gateway).handle(command("daily")).await.unwrap_err();

        assert!(matches!(err, BillingError::InvalidPlan(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn requires_existing_subscription() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([Profile::new(user())]));
        let gateway = MockPaymentGateway::new();

        let err = handler(store, &gateway).handle(command("weekly")).await.unwrap_err();

        assert!(matches!(err, BillingError::NoActiveSubscription(_)));
        assert!(!gateway.was_called("create_checkout_session"));
        assert!(!gateway.was_called("update_subscription_plan"));
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = Arc::new(InMemoryProfileStore::new());
        let gateway = MockPaymentGateway::new();

        let err = handler(store, &gateway).handle(command("weekly")).await.unwrap_err();

        assert!(matches!(err, BillingError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn gateway_failure_keeps_old_tier() {
        let store = Arc::new(InMemoryProfileStore::with_profiles([subscribed()]));
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error(
            "update_subscription_plan",
            GatewayError::invalid_request("No such price"),
        );

        let err = handler(store.clone(), &gateway)
            .handle(command("yearly"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Gateway { retryable: false, .. }));
        assert_eq!(
            store.get(&user()).unwrap().subscription_tier,
            Some(PlanType::Monthly)
        );
    }
}
