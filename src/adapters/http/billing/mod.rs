//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/webhook` - Processor lifecycle events
//! - `POST /api/checkout` - Start checkout
//! - `POST /api/profile` - Create profile
//! - `GET /api/profile/subscription-status` - Subscription status
//! - `POST /api/profile/change-plan` - Change plan
//! - `POST /api/profile/unsubscribe` - Cancel at period end
//! - `GET /api/plans` - Plan catalog

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, SIGNATURE_HEADER};
pub use routes::{public_routes, session_routes};
