//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ProfileStore` - Per-user subscription records
//! - `PaymentGateway` - External billing processor
//! - `SessionValidator` - Bearer token to user identity

mod payment_gateway;
mod profile_store;
mod session_validator;

pub use payment_gateway::{
    BillingEvent, BillingEventKind, CheckoutRequest, CheckoutSession, GatewayError,
    GatewayErrorCode, PaymentGateway, SubscriptionSnapshot,
};
pub use profile_store::ProfileStore;
pub use session_validator::SessionValidator;
