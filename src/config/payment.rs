//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::PriceIds;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Override for the Stripe API host (stripe-mock, tests)
    pub stripe_api_base_url: Option<String>,

    /// Reject webhook events not sent in live mode
    #[serde(default)]
    pub require_livemode: bool,

    pub weekly_price_id: Option<String>,
    pub monthly_price_id: Option<String>,
    pub yearly_price_id: Option<String>,
}

impl PaymentConfig {
    /// Creates a config with only the two required secrets.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            stripe_api_key: SecretString::new(api_key.into()),
            stripe_webhook_secret: SecretString::new(webhook_secret.into()),
            stripe_api_base_url: None,
            require_livemode: false,
            weekly_price_id: None,
            monthly_price_id: None,
            yearly_price_id: None,
        }
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Price references for the plan catalog, falling back to defaults.
    pub fn price_ids(&self) -> PriceIds {
        let defaults = PriceIds::default();
        PriceIds {
            weekly: self.weekly_price_id.clone().unwrap_or(defaults.weekly),
            monthly: self.monthly_price_id.clone().unwrap_or(defaults.monthly),
            yearly: self.yearly_price_id.clone().unwrap_or(defaults.yearly),
        }
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Catch publishable keys and swapped secrets early
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        Ok(())
    }
}
