//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` against the Stripe REST API with form-encoded
//! requests and basic auth, as Stripe expects.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) against replayed deliveries
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::PaymentConfig;
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{
    BillingEvent, BillingEventKind, CheckoutRequest, CheckoutSession, GatewayError,
    GatewayErrorCode, PaymentGateway, SubscriptionSnapshot,
};

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeErrorBody, StripeInvoice, StripeSubscription,
    StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    api_base_url: String,

    /// Reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
        }
    }

    /// Point the adapter at a different API host (stripe-mock, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

impl From<&PaymentConfig> for StripeConfig {
    fn from(config: &PaymentConfig) -> Self {
        let stripe = Self::new(
            config.stripe_api_key.clone(),
            config.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(config.require_livemode);

        match &config.stripe_api_base_url {
            Some(url) => stripe.with_base_url(url.clone()),
            None => stripe,
        }
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base_url", &self.api_base_url)
            .field("require_livemode", &self.require_livemode)
            .finish_non_exhaustive()
    }
}

/// Stripe implementation of `PaymentGateway`.
pub struct StripePaymentGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify the header's signature over `payload` at time `now`.
    ///
    /// Accepts the event if any `v1` signature matches.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), GatewayError> {
        let Some(age) = now.checked_sub(header.timestamp) else {
            tracing::warn!(
                event_timestamp = header.timestamp,
                "Webhook timestamp out of range"
            );
            return Err(GatewayError::invalid_signature("Invalid timestamp"));
        };

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay"
            );
            return Err(GatewayError::invalid_signature(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from the future - clock skew or manipulation"
            );
            return Err(GatewayError::invalid_signature("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| GatewayError::invalid_signature(e.to_string()))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));

        if !matched {
            tracing::warn!(
                candidates = header.v1_signatures.len(),
                "Webhook signature mismatch"
            );
            return Err(GatewayError::invalid_signature("Invalid signature"));
        }

        Ok(())
    }

    /// Parse an already verified payload into a `BillingEvent`.
    fn parse_event(&self, payload: &[u8]) -> Result<BillingEvent, GatewayError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            GatewayError::invalid_request(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(event_id = %stripe_event.id, "Rejected test mode event");
            return Err(GatewayError::invalid_request(
                "Test mode events are not accepted",
            ));
        }

        let kind = extract_event_kind(&stripe_event)?;

        Ok(BillingEvent {
            id: stripe_event.id,
            event_type: stripe_event.event_type,
            kind,
            livemode: stripe_event.livemode,
            created_at: stripe_event.created.and_then(Timestamp::from_unix_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn get_stripe_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<StripeSubscription, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        read_json(response, "Subscription").await
    }
}

fn extract_event_kind(event: &StripeWebhookEvent) -> Result<BillingEventKind, GatewayError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSession = parse_object(event, "checkout session")?;
            Ok(BillingEventKind::CheckoutCompleted {
                user_id: session.user_id(),
                plan_type: session.plan_type(),
                subscription_id: session.subscription,
                session_id: session.id,
            })
        }
        "invoice.payment_failed" => {
            let invoice: StripeInvoice = parse_object(event, "invoice")?;
            Ok(BillingEventKind::InvoicePaymentFailed {
                subscription_id: invoice.subscription_id(),
                invoice_id: invoice.id,
            })
        }
        "customer.subscription.deleted" => {
            let sub: StripeSubscription = parse_object(event, "subscription")?;
            Ok(BillingEventKind::SubscriptionDeleted {
                subscription_id: sub.id,
            })
        }
        _ => Ok(BillingEventKind::Other),
    }
}

fn parse_object<T: DeserializeOwned>(
    event: &StripeWebhookEvent,
    what: &str,
) -> Result<T, GatewayError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| GatewayError::invalid_request(format!("Invalid {}: {}", what, e)))
}

/// Map a Stripe response to `T`, or to a `GatewayError` on non-2xx.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, GatewayError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let api_error = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .map(|b| b.error);
        let message = api_error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| format!("Stripe API error ({})", status));

        tracing::error!(
            status = status.as_u16(),
            resource,
            error = %message,
            "Stripe request failed"
        );

        let mut err = match status {
            reqwest::StatusCode::NOT_FOUND => GatewayError::not_found(resource),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                GatewayError::authentication(message)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                GatewayError::new(GatewayErrorCode::RateLimitExceeded, message)
            }
            s if s.is_server_error() => GatewayError::provider(message),
            _ => GatewayError::invalid_request(message),
        };
        if let Some(code) = api_error.and_then(|e| e.code) {
            err = err.with_provider_code(code);
        }
        return Err(err);
    }

    response.json().await.map_err(|e| {
        GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
    })
}

fn snapshot(sub: StripeSubscription) -> Result<SubscriptionSnapshot, GatewayError> {
    let period_end = sub.period_end().and_then(Timestamp::from_unix_secs);
    let price_id = sub.first_item().map(|item| item.price.id.clone());
    let id = SubscriptionId::new(sub.id)
        .map_err(|e| GatewayError::provider(format!("Stripe returned {}", e)))?;

    Ok(SubscriptionSnapshot {
        id,
        status: sub.status,
        cancel_at_period_end: sub.cancel_at_period_end,
        current_period_end: period_end,
        price_id,
    })
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut params = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("client_reference_id", request.user_id.to_string()),
            (
                "metadata[clerkUserId]",
                request.user_id.to_string(),
            ),
            ("metadata[planType]", request.plan_type.to_string()),
        ];

        if let Some(email) = &request.customer_email {
            params.push(("customer_email", email.clone()));
        }

        let response = self
            .http_client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let session: StripeCheckoutSession = read_json(response, "Checkout session").await?;

        let url = session
            .url
            .ok_or_else(|| GatewayError::provider("Checkout session has no redirect URL"))?;

        tracing::info!(
            user_id = %request.user_id,
            plan_type = %request.plan_type,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn cancel_at_period_end(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<SubscriptionSnapshot, GatewayError> {
        let response = self
            .http_client
            .post(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let sub: StripeSubscription = read_json(response, "Subscription").await?;
        snapshot(sub)
    }

    async fn update_subscription_plan(
        &self,
        subscription_id: &SubscriptionId,
        price_id: &str,
    ) -> Result<SubscriptionSnapshot, GatewayError> {
        let current = self.get_stripe_subscription(subscription_id).await?;
        let item = current.first_item().ok_or_else(|| {
            GatewayError::invalid_request(format!("Subscription {} has no items", subscription_id))
        })?;

        let response = self
            .http_client
            .post(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&[
                ("items[0][id]", item.id.as_str()),
                ("items[0][price]", price_id),
                ("proration_behavior", "create_prorations"),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let sub: StripeSubscription = read_json(response, "Subscription").await?;
        snapshot(sub)
    }

    async fn verify_and_parse_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, GatewayError> {
        let header = SignatureHeader::parse(signature_header).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            GatewayError::invalid_signature(e.to_string())
        })?;

        self.verify_signature(payload, &header, chrono::Utc::now().timestamp())?;

        let event = self.parse_event(payload)?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook signature verified"
        );

        Ok(event)
    }
}
