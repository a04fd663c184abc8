//! StartCheckoutHandler - Creates a hosted checkout session for a plan.
//!
//! Never touches the profile store. The subscription is only recorded when
//! the processor reports the completed checkout through the webhook.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog, PlanType};
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{CheckoutRequest, PaymentGateway};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    /// The authenticated caller; authoritative over `requested_user_id`.
    pub user: AuthenticatedUser,
    /// Raw plan selector from the client.
    pub plan_type: String,
    /// User id the client claims to act for, if it sent one.
    pub requested_user_id: Option<String>,
    /// Billing email override; defaults to the session email.
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub session_id: String,
    /// Where the client must navigate to pay.
    pub url: String,
    pub plan_type: PlanType,
}

/// Redirect targets handed to the processor.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

pub struct StartCheckoutHandler {
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<PlanCatalog>,
    urls: CheckoutUrls,
}

impl StartCheckoutHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<PlanCatalog>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            gateway,
            catalog,
            urls,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        // 1. The session decides who pays
        if let Some(requested) = cmd.requested_user_id.as_deref().map(str::trim) {
            if !requested.is_empty() && requested != cmd.user.id.as_str() {
                tracing::warn!(
                    user_id = %cmd.user.id,
                    requested_user_id = requested,
                    "Checkout requested for a different user"
                );
                return Err(BillingError::validation(
                    "userId",
                    "does not match the authenticated user",
                ));
            }
        }

        // 2. Plan selector to price reference
        let plan = self.catalog.resolve(&cmd.plan_type)?;

        let customer_email = cmd
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .or(cmd.user.email);

        // 3. Ask the processor for a hosted session
        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                user_id: cmd.user.id.clone(),
                plan_type: plan.plan_type,
                price_id: plan.price_id.clone(),
                customer_email,
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(user_id = %cmd.user.id, error = %e, "Checkout session failed");
                BillingError::from(e)
            })?;

        tracing::info!(
            user_id = %cmd.user.id,
            plan_type = %plan.plan_type,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(StartCheckoutResult {
            session_id: session.id,
            url: session.url,
            plan_type: plan.plan_type,
        })
    }
}
