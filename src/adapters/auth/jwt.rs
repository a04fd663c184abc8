//! HS256 session token validator.
//!
//! Implements the `SessionValidator` port for identity providers that sign
//! session JWTs with a shared secret. It validates:
//!
//! - **Signature**: HS256 over the configured secret
//! - **Expiry (exp)**: must be in the future, within the configured leeway
//! - **Issuer (iss)** and **Audience (aud)**: only when configured
//!
//! Accepted claims map onto `AuthenticatedUser`: `sub` becomes the user id,
//! `email` and `name` are carried when present.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Claims we read from a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "Token issued for another party");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            })?
            .claims;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Token has a blank subject");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.email, claims.name))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn claims(sub: &str, exp_offset: i64) -> SessionClaims {
        SessionClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            email: Some(format!("{}@example.com", sub)),
            name: Some("Test User".to_string()),
            iss: None,
            aud: None,
        }
    }

    fn sign(claims: &SessionClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(&AuthConfig::new(SECRET))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Accepted Tokens
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_token_maps_claims_to_user() {
        let token = sign(&claims("user_1", 3600), SECRET);

        let user = validator().validate(&token).await.unwrap();

        assert_eq!(user.id.as_str(), "user_1");
        assert_eq!(user.email.as_deref(), Some("user_1@example.com"));
        assert_eq!(user.display_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn email_and_name_are_optional() {
        let mut c = claims("user_1", 3600);
        c.email = None;
        c.name = None;

        let user = validator().validate(&sign(&c, SECRET)).await.unwrap();

        assert!(user.email.is_none());
        assert_eq!(user.display_name_or_id(), "user_1");
    }

    #[tokio::test]
    async fn configured_issuer_and_audience_are_accepted() {
        let mut config = AuthConfig::new(SECRET);
        config.issuer = Some("https://auth.example.com".to_string());
        config.audience = Some("meal-planner".to_string());
        let mut c = claims("user_1", 3600);
        c.iss = config.issuer.clone();
        c.aud = config.audience.clone();

        let result = JwtSessionValidator::new(&config)
            .validate(&sign(&c, SECRET))
            .await;
        assert!(result.is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejected Tokens
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = sign(&claims("user_1", -3600), SECRET);
        let err = validator().validate(&token).await.unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = sign(&claims("user_1", 3600), "another-secret");
        let err = validator().validate(&token).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let err = validator().validate("not.a.jwt").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn empty_token_is_missing() {
        let err = validator().validate("").await.unwrap_err();
        assert_eq!(err, AuthError::MissingToken);
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let token = sign(&claims("  ", 3600), SECRET);
        let err = validator().validate(&token).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let mut config = AuthConfig::new(SECRET);
        config.issuer = Some("https://auth.example.com".to_string());
        let mut c = claims("user_1", 3600);
        c.iss = Some("https://evil.example.com".to_string());

        let err = JwtSessionValidator::new(&config)
            .validate(&sign(&c, SECRET))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[test]
    fn validator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JwtSessionValidator>();
    }
}
