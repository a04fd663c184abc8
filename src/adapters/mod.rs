//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session token validation
//! - `http` - axum routes, middleware and DTOs
//! - `memory` - In-memory profile store
//! - `postgres` - PostgreSQL profile store
//! - `stripe` - Stripe payment gateway

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
