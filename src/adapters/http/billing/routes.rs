//! Route table for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    change_plan, create_profile, handle_webhook, list_plans, start_checkout, subscription_status,
    unsubscribe, BillingAppState,
};

/// Routes that act for the signed-in caller.
///
/// # Routes
/// - `POST /checkout` - Start a hosted checkout
/// - `POST /profile` - Create the caller's profile
/// - `GET /profile/subscription-status` - Caller's subscription fields
/// - `POST /profile/change-plan` - Swap plans
/// - `POST /profile/unsubscribe` - Cancel at period end
pub fn session_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/profile", post(create_profile))
        .route("/profile/subscription-status", get(subscription_status))
        .route("/profile/change-plan", post(change_plan))
        .route("/profile/unsubscribe", post(unsubscribe))
}

/// Routes without a session.
///
/// The webhook is authenticated by its signature instead.
///
/// # Routes
/// - `POST /webhook` - Processor events
/// - `GET /plans` - Plan catalog
pub fn public_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/plans", get(list_plans))
}
