//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Minimum HS256 secret length accepted outside development.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Session token verification (HS256 JWT)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the identity provider signs session tokens with
    pub jwt_secret: SecretString,

    /// Expected `iss` claim, if the provider sets one
    pub issuer: Option<String>,

    /// Expected `aud` claim, if the provider sets one
    pub audience: Option<String>,

    /// Clock skew tolerance for `exp`/`nbf` in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            issuer: None,
            audience: None,
            leeway_secs: default_leeway(),
        }
    }

    /// Validate authentication configuration
    ///
    /// Short secrets are allowed in development only.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_JWT_SECRET"));
        }
        if *environment != Environment::Development && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_LEN));
        }
        Ok(())
    }
}

fn default_leeway() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::new("secret");
        assert_eq!(config.leeway_secs, 30);
        assert!(config.issuer.is_none());
    }

    #[test]
    fn test_validation_missing_secret() {
        let config = AuthConfig::new("");
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_validation_short_secret_only_in_development() {
        let config = AuthConfig::new("short");
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(matches!(
            config.validate(&Environment::Production),
            Err(ValidationError::JwtSecretTooShort(32))
        ));
    }

    #[test]
    fn test_validation_long_secret_in_production() {
        let config = AuthConfig::new("x".repeat(48));
        assert!(config.validate(&Environment::Production).is_ok());
    }
}
