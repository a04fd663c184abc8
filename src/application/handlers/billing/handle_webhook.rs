//! HandleWebhookHandler - Applies verified processor events to profiles.
//!
//! This is the authoritative writer of subscription state. Every transition
//! is a plain field assignment, so redelivered events converge to the same
//! profile.
//!
//! | Event | Lookup | Effect |
//! |-------|--------|--------|
//! | `checkout.session.completed` | user id from metadata | bind subscription, active, tier (1) |
//! | `invoice.payment_failed` | subscription id | inactive, keep subscription and tier |
//! | `customer.subscription.deleted` | subscription id | clear all subscription fields |
//! | anything else | none | acknowledged, ignored |
//!
//! (1) The tier column only holds known plans. A `planType` in metadata
//! that names no plan is logged and stored as no tier; the subscription is
//! still bound and activated.
//!
//! Verification failures abort the request. Once verified, failures while
//! applying an event are logged and reported as `Skipped`, never as errors.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanType, Profile, ProfileKey, ProfileUpdate};
use crate::domain::foundation::{ErrorCode, SubscriptionId, UserId};
use crate::ports::{
    BillingEvent, BillingEventKind, GatewayError, GatewayErrorCode, PaymentGateway, ProfileStore,
};

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// What happened to a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The profile transition was written.
    Applied {
        event_id: String,
        event_type: String,
        user_id: UserId,
    },
    /// Recognized event that changed nothing: missing data, no matching
    /// profile, or a store failure.
    Skipped {
        event_id: String,
        event_type: String,
        reason: String,
    },
    /// Event type we do not act on.
    Ignored { event_type: String },
}

impl WebhookOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WebhookOutcome::Applied { .. })
    }
}

pub struct HandleWebhookHandler {
    store: Arc<dyn ProfileStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl HandleWebhookHandler {
    pub fn new(store: Arc<dyn ProfileStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Verify, parse and apply one delivery.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if the signature header does not authenticate
    ///   the payload
    /// - `ValidationFailed` if the authenticated payload is not a usable event
    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, BillingError> {
        let event = self
            .gateway
            .verify_and_parse_event(&cmd.payload, &cmd.signature)
            .await
            .map_err(rejection)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Webhook event verified"
        );

        let outcome = match self.apply(&event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "Failed to apply webhook event"
                );
                skipped(&event, err.to_string())
            }
        };

        Ok(outcome)
    }

    async fn apply(&self, event: &BillingEvent) -> Result<WebhookOutcome, BillingError> {
        match &event.kind {
            BillingEventKind::CheckoutCompleted {
                user_id,
                subscription_id,
                plan_type,
                ..
            } => {
                self.apply_checkout_completed(
                    event,
                    user_id.as_deref(),
                    subscription_id.as_deref(),
                    plan_type.as_deref(),
                )
                .await
            }
            BillingEventKind::InvoicePaymentFailed {
                subscription_id, ..
            } => {
                let Some(subscription_id) = parse_subscription(subscription_id.as_deref()) else {
                    tracing::debug!(event_id = %event.id, "Invoice has no subscription");
                    return Ok(skipped(event, "invoice has no subscription"));
                };
                self.apply_by_subscription(event, subscription_id, ProfileUpdate::deactivated())
                    .await
            }
            BillingEventKind::SubscriptionDeleted { subscription_id } => {
                let Some(subscription_id) = parse_subscription(Some(subscription_id)) else {
                    return Ok(skipped(event, "subscription id is blank"));
                };
                self.apply_by_subscription(event, subscription_id, ProfileUpdate::cleared())
                    .await
            }
            BillingEventKind::Other => {
                tracing::debug!(event_type = %event.event_type, "Unhandled webhook event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
        }
    }

    async fn apply_checkout_completed(
        &self,
        event: &BillingEvent,
        user_id: Option<&str>,
        subscription_id: Option<&str>,
        plan_type: Option<&str>,
    ) -> Result<WebhookOutcome, BillingError> {
        let Some(user_id) = user_id.and_then(|id| UserId::new(id).ok()) else {
            tracing::warn!(event_id = %event.id, "Checkout session has no user id metadata");
            return Ok(skipped(event, "checkout session has no user id"));
        };
        let Some(subscription_id) = parse_subscription(subscription_id) else {
            tracing::warn!(
                event_id = %event.id,
                user_id = %user_id,
                "Checkout session has no subscription"
            );
            return Ok(skipped(event, "checkout session has no subscription"));
        };

        let tier = plan_type.and_then(|raw| match raw.parse::<PlanType>() {
            Ok(tier) => Some(tier),
            Err(_) => {
                tracing::warn!(
                    event_id = %event.id,
                    plan_type = raw,
                    "Unknown plan type in checkout metadata, storing no tier"
                );
                None
            }
        });

        let update = ProfileUpdate::activated(subscription_id.clone(), tier);
        match self.store.update(&ProfileKey::from(user_id.clone()), &update).await {
            Ok(profile) => {
                tracing::info!(
                    event_id = %event.id,
                    user_id = %profile.user_id,
                    subscription_id = %subscription_id,
                    tier = ?profile.subscription_tier,
                    "Subscription activated"
                );
                Ok(applied(event, profile))
            }
            Err(err) if err.code == ErrorCode::ProfileNotFound => {
                tracing::warn!(
                    event_id = %event.id,
                    user_id = %user_id,
                    "Checkout completed for a user without a profile"
                );
                Ok(skipped(event, format!("no profile for user {}", user_id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_by_subscription(
        &self,
        event: &BillingEvent,
        subscription_id: SubscriptionId,
        update: ProfileUpdate,
    ) -> Result<WebhookOutcome, BillingError> {
        let key = ProfileKey::from(subscription_id.clone());
        match self.store.update(&key, &update).await {
            Ok(profile) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %profile.user_id,
                    subscription_id = %subscription_id,
                    active = profile.subscription_active,
                    "Subscription state updated"
                );
                Ok(applied(event, profile))
            }
            Err(err) if err.code == ErrorCode::ProfileNotFound => {
                // Expected after a local cancel: the id was already cleared.
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    subscription_id = %subscription_id,
                    "No profile bound to subscription"
                );
                Ok(skipped(event, format!("no profile for {}", key)))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn rejection(err: GatewayError) -> BillingError {
    match err.code {
        GatewayErrorCode::InvalidSignature => {
            tracing::warn!(error = %err.message, "Rejected webhook with invalid signature");
            BillingError::invalid_signature(err.message)
        }
        _ => {
            tracing::warn!(error = %err, "Rejected unparseable webhook");
            BillingError::validation("payload", err.message)
        }
    }
}

fn parse_subscription(raw: Option<&str>) -> Option<SubscriptionId> {
    raw.and_then(|id| SubscriptionId::new(id).ok())
}

fn applied(event: &BillingEvent, profile: Profile) -> WebhookOutcome {
    if !profile.is_consistent() {
        tracing::warn!(
            event_id = %event.id,
            user_id = %profile.user_id,
            "Profile is active without a subscription id"
        );
    }
    WebhookOutcome::Applied {
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
        user_id: profile.user_id,
    }
}

fn skipped(event: &BillingEvent, reason: impl Into<String>) -> WebhookOutcome {
    WebhookOutcome::Skipped {
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
        reason: reason.into(),
    }
}
