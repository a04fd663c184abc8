//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InvalidSignature | 400 |
//! | InvalidPlan | 400 |
//! | ValidationFailed | 400 |
//! | Unauthorized | 401 |
//! | ProfileNotFound | 404 |
//! | SubscriptionNotFound | 404 |
//! | NoActiveSubscription | 409 |
//! | Gateway | 502 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Webhook payload could not be authenticated. Never retried here.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// The processor does not know the referenced subscription.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("User {0} has no active subscription")]
    NoActiveSubscription(UserId),

    #[error("Unknown plan: {0}")]
    InvalidPlan(String),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    /// The payment processor rejected or failed a request.
    #[error("Payment provider error: {message}")]
    Gateway { message: String, retryable: bool },

    #[error("Internal error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        BillingError::InvalidSignature(reason.into())
    }

    pub fn profile_not_found_for_user(user_id: &UserId) -> Self {
        BillingError::ProfileNotFound(format!("user {}", user_id))
    }

    pub fn subscription_not_found(id: &SubscriptionId) -> Self {
        BillingError::SubscriptionNotFound(id.to_string())
    }

    pub fn no_active_subscription(user_id: UserId) -> Self {
        BillingError::NoActiveSubscription(user_id)
    }

    pub fn invalid_plan(plan: impl Into<String>) -> Self {
        BillingError::InvalidPlan(plan.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn gateway(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::Gateway {
            message: message.into(),
            retryable,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::InvalidSignature(_) => ErrorCode::InvalidWebhookSignature,
            BillingError::ProfileNotFound(_) => ErrorCode::ProfileNotFound,
            BillingError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::NoActiveSubscription(_) => ErrorCode::NoActiveSubscription,
            BillingError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Unauthorized => ErrorCode::Unauthorized,
            BillingError::Gateway { .. } => ErrorCode::PaymentProviderError,
            BillingError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ProfileNotFound => BillingError::ProfileNotFound(err.message),
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            BillingError::invalid_signature("bad").code(),
            ErrorCode::InvalidWebhookSignature
        );
        assert_eq!(
            BillingError::profile_not_found_for_user(&test_user_id()).code(),
            ErrorCode::ProfileNotFound
        );
        assert_eq!(
            BillingError::no_active_subscription(test_user_id()).code(),
            ErrorCode::NoActiveSubscription
        );
        assert_eq!(BillingError::invalid_plan("x").code(), ErrorCode::InvalidPlan);
        assert_eq!(
            BillingError::gateway("down", true).code(),
            ErrorCode::PaymentProviderError
        );
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            BillingError::profile_not_found_for_user(&test_user_id()).to_string(),
            "Profile not found: user u1"
        );
        assert_eq!(
            BillingError::no_active_subscription(test_user_id()).to_string(),
            "User u1 has no active subscription"
        );
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(BillingError::gateway("timeout", true).is_retryable());
        assert!(!BillingError::gateway("card declined", false).is_retryable());
        assert!(BillingError::infrastructure("db down").is_retryable());
        assert!(!BillingError::invalid_signature("tampered").is_retryable());
    }

    #[test]
    fn domain_not_found_maps_to_profile_not_found() {
        let err: BillingError =
            DomainError::new(ErrorCode::ProfileNotFound, "subscription sub_1").into();
        assert_eq!(err, BillingError::ProfileNotFound("subscription sub_1".to_string()));
    }

    #[test]
    fn domain_database_error_maps_to_infrastructure() {
        let err: BillingError = DomainError::database("pool timed out").into();
        assert!(matches!(err, BillingError::Infrastructure(_)));
    }

    #[test]
    fn validation_error_keeps_field() {
        let err: BillingError = ValidationError::empty_field("user_id").into();
        assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "user_id"));
    }
}
