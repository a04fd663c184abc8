//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe:
//! - Checkout sessions for new subscriptions
//! - Cancel at period end and plan changes
//! - Webhook signature verification and event parsing
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated against replays (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod mock_gateway;
mod stripe_adapter;
mod webhook_types;

pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_adapter::{StripeConfig, StripePaymentGateway};
pub use webhook_types::{
    SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeInvoice,
    StripeSubscription, StripeWebhookEvent,
};
