//! Mock payment gateway for testing.
//!
//! Configurable stand-in for `PaymentGateway` used by handler and HTTP
//! tests. Supports canned webhook events, per-method error injection and
//! call tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{
    BillingEvent, BillingEventKind, CheckoutRequest, CheckoutSession, GatewayError,
    PaymentGateway, SubscriptionSnapshot,
};

/// Mock payment gateway.
///
/// Clones share state, so a test can keep a handle after giving one to
/// the code under test.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new()
///     .with_event(MockPaymentGateway::subscription_deleted_event("sub_1"));
/// gateway.set_method_error("cancel_at_period_end", GatewayError::network("down"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Event returned by every successful verification.
    webhook_event: Option<BillingEvent>,
    webhook_mode: WebhookVerifyMode,
    method_errors: HashMap<String, GatewayError>,
    checkout_requests: Vec<CheckoutRequest>,
    call_log: Vec<MethodCall>,
    sessions_created: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default, Clone)]
enum WebhookVerifyMode {
    #[default]
    AcceptAll,
    RequireSignature(String),
    AlwaysFail,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that fails every webhook verification.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().webhook_mode = WebhookVerifyMode::AlwaysFail;
        mock
    }

    /// Mock that only accepts the exact signature header given.
    pub fn requiring_signature(signature: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.state().webhook_mode = WebhookVerifyMode::RequireSignature(signature.into());
        mock
    }

    /// Event returned by `verify_and_parse_event`.
    pub fn with_event(self, event: BillingEvent) -> Self {
        self.set_event(event);
        self
    }

    pub fn set_event(&self, event: BillingEvent) {
        self.state().webhook_event = Some(event);
    }

    /// Make `method` fail with `error` until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Checkout requests received, in order.
    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        match self.state().method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.record_call(
            "create_checkout_session",
            vec![request.user_id.to_string(), request.price_id.clone()],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.sessions_created += 1;
        let id = format!("cs_test_mock_{}", state.sessions_created);
        state.checkout_requests.push(request);

        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            id,
        })
    }

    async fn cancel_at_period_end(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<SubscriptionSnapshot, GatewayError> {
        self.record_call("cancel_at_period_end", vec![subscription_id.to_string()]);
        self.check_error("cancel_at_period_end")?;

        Ok(SubscriptionSnapshot {
            id: subscription_id.clone(),
            status: "active".to_string(),
            cancel_at_period_end: true,
            current_period_end: Some(period_end()),
            price_id: None,
        })
    }

    async fn update_subscription_plan(
        &self,
        subscription_id: &SubscriptionId,
        price_id: &str,
    ) -> Result<SubscriptionSnapshot, GatewayError> {
        self.record_call(
            "update_subscription_plan",
            vec![subscription_id.to_string(), price_id.to_string()],
        );
        self.check_error("update_subscription_plan")?;

        Ok(SubscriptionSnapshot {
            id: subscription_id.clone(),
            status: "active".to_string(),
            cancel_at_period_end: false,
            current_period_end: Some(period_end()),
            price_id: Some(price_id.to_string()),
        })
    }

    async fn verify_and_parse_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, GatewayError> {
        self.record_call(
            "verify_and_parse_event",
            vec![
                String::from_utf8_lossy(payload).chars().take(50).collect(),
                signature_header.chars().take(20).collect(),
            ],
        );
        self.check_error("verify_and_parse_event")?;

        let state = self.state();
        match &state.webhook_mode {
            WebhookVerifyMode::AcceptAll => {}
            WebhookVerifyMode::RequireSignature(required) if signature_header == required => {}
            WebhookVerifyMode::RequireSignature(_) => {
                return Err(GatewayError::invalid_signature("Invalid signature"));
            }
            WebhookVerifyMode::AlwaysFail => {
                return Err(GatewayError::invalid_signature("Verification disabled"));
            }
        }

        state
            .webhook_event
            .clone()
            .ok_or_else(|| GatewayError::invalid_request("No mock event configured"))
    }
}

fn period_end() -> Timestamp {
    Timestamp::from_datetime(chrono::Utc::now() + chrono::Duration::days(30))
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Builders
// ════════════════════════════════════════════════════════════════════════════════

impl MockPaymentGateway {
    pub fn event(event_type: &str, kind: BillingEventKind) -> BillingEvent {
        BillingEvent {
            id: format!("evt_mock_{}", event_type.replace('.', "_")),
            event_type: event_type.to_string(),
            kind,
            livemode: false,
            created_at: Some(Timestamp::now()),
        }
    }

    pub fn checkout_completed_event(
        user_id: &str,
        subscription_id: &str,
        plan_type: &str,
    ) -> BillingEvent {
        Self::event(
            "checkout.session.completed",
            BillingEventKind::CheckoutCompleted {
                session_id: "cs_test_mock".to_string(),
                user_id: Some(user_id.to_string()),
                subscription_id: Some(subscription_id.to_string()),
                plan_type: Some(plan_type.to_string()),
            },
        )
    }

    pub fn payment_failed_event(subscription_id: &str) -> BillingEvent {
        Self::event(
            "invoice.payment_failed",
            BillingEventKind::InvoicePaymentFailed {
                invoice_id: "in_mock".to_string(),
                subscription_id: Some(subscription_id.to_string()),
            },
        )
    }

    pub fn subscription_deleted_event(subscription_id: &str) -> BillingEvent {
        Self::event(
            "customer.subscription.deleted",
            BillingEventKind::SubscriptionDeleted {
                subscription_id: subscription_id.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::UserId;
    use crate::ports::GatewayErrorCode;

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            user_id: UserId::new("user_1").unwrap(),
            plan_type: PlanType::Monthly,
            price_id: "price_monthly".to_string(),
            customer_email: None,
            success_url: "http://localhost/success".to_string(),
            cancel_url: "http://localhost/subscribe".to_string(),
        }
    }

    #[tokio::test]
    async fn checkout_sessions_get_distinct_ids() {
        let mock = MockPaymentGateway::new();

        let first = mock.create_checkout_session(checkout_request()).await.unwrap();
        let second = mock.create_checkout_session(checkout_request()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.url.ends_with(&first.id));
        assert_eq!(mock.checkout_requests().len(), 2);
    }

    #[tokio::test]
    async fn method_error_is_returned_until_cleared() {
        let mock = MockPaymentGateway::new();
        let sub = SubscriptionId::new("sub_1").unwrap();
        mock.set_method_error("cancel_at_period_end", GatewayError::not_found("Subscription"));

        let err = mock.cancel_at_period_end(&sub).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::NotFound);

        mock.clear_errors();
        let snapshot = mock.cancel_at_period_end(&sub).await.unwrap();
        assert!(snapshot.cancel_at_period_end);
        assert_eq!(mock.call_count("cancel_at_period_end"), 2);
    }

    #[tokio::test]
    async fn update_reports_new_price() {
        let mock = MockPaymentGateway::new();
        let sub = SubscriptionId::new("sub_1").unwrap();

        let snapshot = mock.update_subscription_plan(&sub, "price_yearly").await.unwrap();

        assert_eq!(snapshot.price_id.as_deref(), Some("price_yearly"));
        assert_eq!(
            mock.calls()[0].args,
            vec!["sub_1".to_string(), "price_yearly".to_string()]
        );
    }

    #[tokio::test]
    async fn returns_configured_event() {
        let event = MockPaymentGateway::subscription_deleted_event("sub_1");
        let mock = MockPaymentGateway::new().with_event(event.clone());

        let parsed = mock.verify_and_parse_event(b"{}", "t=1,v1=aa").await.unwrap();
        assert_eq!(parsed, event);
    }

    #[tokio::test]
    async fn rejecting_mock_fails_verification() {
        let mock = MockPaymentGateway::rejecting_webhooks()
            .with_event(MockPaymentGateway::payment_failed_event("sub_1"));

        let err = mock.verify_and_parse_event(b"{}", "t=1,v1=aa").await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidSignature);
    }

    #[tokio::test]
    async fn required_signature_must_match() {
        let mock = MockPaymentGateway::requiring_signature("t=1,v1=good")
            .with_event(MockPaymentGateway::payment_failed_event("sub_1"));

        assert!(mock.verify_and_parse_event(b"{}", "t=1,v1=good").await.is_ok());
        let err = mock.verify_and_parse_event(b"{}", "t=1,v1=bad").await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidSignature);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockPaymentGateway::new();
        let handle = mock.clone();

        mock.create_checkout_session(checkout_request()).await.unwrap();

        assert!(handle.was_called("create_checkout_session"));
    }
}
