//! Meal Planner - subscription billing backend
//!
//! Keeps each user's locally stored subscription record consistent with
//! the payment processor across checkout, plan changes, cancellation and
//! asynchronous webhook notifications.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
