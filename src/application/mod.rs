//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates domain operations across ports. Command handlers write,
//! query handlers read.

pub mod handlers;

pub use handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    ChangePlanCommand, ChangePlanHandler, ChangePlanResult, CheckoutUrls, CreateProfileCommand,
    CreateProfileHandler, CreateProfileResult, GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery, GetSubscriptionStatusResult, HandleWebhookCommand,
    HandleWebhookHandler, ListPlansHandler, ListPlansResult, StartCheckoutCommand,
    StartCheckoutHandler, StartCheckoutResult, WebhookOutcome,
};
