//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `billing` - Profiles, plans, and subscription state transitions

pub mod billing;
pub mod foundation;
