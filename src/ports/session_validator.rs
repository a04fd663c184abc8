//! Session validation port.
//!
//! The identity provider is external. Whatever issues session tokens, an
//! adapter behind this port turns a bearer token into a stable user id.
//!
//! Implementations MUST check the token signature and expiry, and the
//! issuer/audience when configured.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed or badly signed tokens
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` when validation could not run
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    struct FixedTokenValidator;

    #[async_trait]
    impl SessionValidator for FixedTokenValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            if token == "good" {
                Ok(AuthenticatedUser::new(UserId::new("u1").unwrap(), None, None))
            } else {
                Err(AuthError::InvalidToken)
            }
        }
    }

    #[tokio::test]
    async fn validator_can_be_used_as_trait_object() {
        let validator: Box<dyn SessionValidator> = Box::new(FixedTokenValidator);

        let user = validator.validate("good").await.unwrap();
        assert_eq!(user.id.as_str(), "u1");
        assert!(matches!(validator.validate("bad").await, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
