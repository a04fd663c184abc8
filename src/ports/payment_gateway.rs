//! Payment gateway port.
//!
//! Wraps the external billing processor: checkout sessions, subscription
//! changes, and authentication of the webhook events it pushes back to us.
//! Implementations receive their credentials at construction; nothing here
//! reads ambient configuration at call time.
//!
//! No call is retried by the port or its callers. Failures propagate
//! immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, PlanType};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a new subscription.
    ///
    /// The user id and plan type travel as session metadata so the
    /// checkout-completed webhook can recover them without a lookup.
    ///
    /// # Errors
    ///
    /// Any processor or network failure.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Stop the subscription from renewing at the end of the current period.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the processor does not know the subscription
    async fn cancel_at_period_end(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<SubscriptionSnapshot, GatewayError>;

    /// Move an existing subscription onto a different price.
    ///
    /// Never creates a subscription.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the processor does not know the subscription
    async fn update_subscription_plan(
        &self,
        subscription_id: &SubscriptionId,
        price_id: &str,
    ) -> Result<SubscriptionSnapshot, GatewayError>;

    /// Authenticate a raw webhook body against its signature header and
    /// parse it.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if verification fails; the body is not parsed
    /// - `InvalidRequest` if the verified body is not a well-formed event
    async fn verify_and_parse_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, GatewayError>;
}

/// Checkout session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub price_id: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the client must be redirected to.
    pub url: String,
}

/// Processor view of a subscription after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: SubscriptionId,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<Timestamp>,
    pub price_id: Option<String>,
}

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub id: String,
    /// Processor event type, e.g. `invoice.payment_failed`.
    pub event_type: String,
    pub kind: BillingEventKind,
    pub livemode: bool,
    pub created_at: Option<Timestamp>,
}

/// Event payloads we act on. Values are the processor's raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutCompleted {
        session_id: String,
        user_id: Option<String>,
        subscription_id: Option<String>,
        plan_type: Option<String>,
    },
    InvoicePaymentFailed {
        invoice_id: String,
        subscription_id: Option<String>,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    /// Any type we do not handle. Always acknowledged.
    Other,
}

/// Payment gateway error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Processor's own error code, if it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidSignature, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::NotFound => BillingError::SubscriptionNotFound(err.message),
            GatewayErrorCode::InvalidSignature => BillingError::InvalidSignature(err.message),
            _ => BillingError::gateway(err.to_string(), err.retryable),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    InvalidSignature,
    ProviderError,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidSignature => "invalid_signature",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(GatewayError::network("connection reset").retryable);
        assert!(!GatewayError::invalid_request("bad price").retryable);
        assert!(!GatewayError::invalid_signature("mismatch").retryable);
    }

    #[test]
    fn error_display_includes_code() {
        let err = GatewayError::not_found("Subscription");
        assert_eq!(err.to_string(), "not_found: Subscription not found");
    }

    #[test]
    fn provider_code_is_attached() {
        let err = GatewayError::invalid_request("No such price").with_provider_code("resource_missing");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }

    #[test]
    fn not_found_converts_to_subscription_not_found() {
        let err: BillingError = GatewayError::not_found("Subscription").into();
        assert!(matches!(err, BillingError::SubscriptionNotFound(_)));
    }

    #[test]
    fn invalid_signature_converts_to_invalid_signature() {
        let err: BillingError = GatewayError::invalid_signature("no v1 match").into();
        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn other_errors_convert_to_gateway_and_keep_retryability() {
        let err: BillingError = GatewayError::network("timeout").into();
        assert!(matches!(err, BillingError::Gateway { retryable: true, .. }));

        let err: BillingError = GatewayError::authentication("bad key").into();
        assert!(matches!(err, BillingError::Gateway { retryable: false, .. }));
    }
}
