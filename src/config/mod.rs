//! Application configuration
//!
//! Typed configuration loaded from environment variables with the `config`
//! and `dotenvy` crates. Variables use the `MEAL_PLANNER` prefix and `__`
//! between nesting levels:
//!
//! - `MEAL_PLANNER__SERVER__PORT=8080` -> `server.port = 8080`
//! - `MEAL_PLANNER__PAYMENT__STRIPE_API_KEY=sk_...` -> `payment.stripe_api_key`
//!
//! ```no_run
//! use meal_planner::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Profile store. Without it, development runs on the in-memory store.
    pub database: Option<DatabaseConfig>,

    /// Session token verification
    pub auth: AuthConfig,

    /// Stripe credentials and price references
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadError` when required variables are missing
    /// or values cannot be parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MEAL_PLANNER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        match &self.database {
            Some(database) => database.validate()?,
            None if self.is_production() => return Err(ValidationError::DatabaseRequired),
            None => {}
        }
        self.auth.validate(&self.server.environment)?;
        self.payment.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
