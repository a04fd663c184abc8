//! Billing handlers.
//!
//! ## Commands
//! - Applying processor webhooks to profiles
//! - Starting a checkout
//! - Changing plan and canceling
//! - Creating the caller's profile
//!
//! ## Queries
//! - Subscription status
//! - Plan catalog

mod cancel_subscription;
mod change_plan;
mod create_profile;
mod get_subscription_status;
mod handle_webhook;
mod list_plans;
mod start_checkout;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use change_plan::{ChangePlanCommand, ChangePlanHandler, ChangePlanResult};
pub use create_profile::{CreateProfileCommand, CreateProfileHandler, CreateProfileResult};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome};
pub use start_checkout::{
    CheckoutUrls, StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult,
};

// Queries
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
pub use list_plans::{ListPlansHandler, ListPlansResult};
