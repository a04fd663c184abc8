//! Billing domain module.
//!
//! Keeps a user's local subscription record consistent with the payment
//! processor.
//!
//! # Module Structure
//!
//! - `profile` - Profile entity, partial updates, lookup keys
//! - `plan` - PlanType and the static plan catalog
//! - `errors` - BillingError taxonomy

mod errors;
mod plan;
mod profile;

pub use errors::BillingError;
pub use plan::{Plan, PlanCatalog, PlanType, PriceIds};
pub use profile::{Profile, ProfileKey, ProfileUpdate};
