//! HTTP adapter - axum router, middleware and billing endpoints.

pub mod billing;
pub mod error;
pub mod middleware;
pub mod router;

pub use billing::{BillingApiError, BillingAppState};
pub use error::ErrorResponse;
pub use router::{api_router, with_http_layers};
