//! Stripe wire types.
//!
//! Only the fields the billing flows read are modelled. Everything else in
//! Stripe's payloads is ignored so new API versions keep parsing.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,
    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,
    #[error("Missing v1 signature in header")]
    MissingV1Signature,
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
    #[error("Malformed signature element: {0}")]
    MalformedElement(String),
}

/// Parsed `Stripe-Signature` header.
///
/// Format: `t=<unix>,v1=<hex>[,v1=<hex>...][,v0=<hex>]`. Stripe sends more
/// than one `v1` while a signing secret is being rolled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| SignatureParseError::MalformedElement(part.trim().to_string()))?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    let bytes = hex::decode(value.trim())
                        .map_err(|_| SignatureParseError::InvalidSignatureFormat)?;
                    v1_signatures.push(bytes);
                }
                // v0 is the legacy test-mode scheme and is never trusted.
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    /// `evt_...`
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub created: Option<i64>,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// The object the event is about; its shape depends on `type`.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Objects
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    /// `cs_...`
    pub id: String,

    /// Hosted checkout page. Present on creation responses.
    pub url: Option<String>,

    pub customer: Option<String>,

    /// Subscription created by a `mode=subscription` session.
    pub subscription: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    /// Metadata key the checkout command writes the user id under.
    pub const USER_ID_KEY: &'static str = "clerkUserId";
    pub const PLAN_TYPE_KEY: &'static str = "planType";

    pub fn user_id(&self) -> Option<String> {
        self.metadata
            .get(Self::USER_ID_KEY)
            .or_else(|| self.metadata.get("user_id"))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    pub fn plan_type(&self) -> Option<String> {
        self.metadata
            .get(Self::PLAN_TYPE_KEY)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// `sub_...`
    pub id: String,

    pub status: String,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Older API versions carry the period on the subscription itself.
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

impl StripeSubscription {
    pub fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    /// Period end from the subscription, or from its first item on newer
    /// API versions.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|i| i.current_period_end))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    /// `si_...`
    pub id: String,
    pub price: StripePrice,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    /// `in_...`
    pub id: String,

    pub subscription: Option<String>,

    /// Newer API versions move the subscription reference under `parent`.
    pub parent: Option<StripeInvoiceParent>,
}

impl StripeInvoice {
    pub fn subscription_id(&self) -> Option<String> {
        self.subscription.clone().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.subscription_details.as_ref())
                .and_then(|d| d.subscription.clone())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<String>,
}

/// Error body returned by the Stripe API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Header Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_signature_header_valid() {
        let header = SignatureHeader::parse("t=1704067200,v1=abcdef01").unwrap();
        assert_eq!(header.timestamp, 1704067200);
        assert_eq!(header.v1_signatures, vec![vec![0xab, 0xcd, 0xef, 0x01]]);
    }

    #[test]
    fn parse_signature_header_collects_every_v1() {
        let header = SignatureHeader::parse("t=1,v1=aa,v1=bb,v0=cc").unwrap();
        assert_eq!(header.v1_signatures, vec![vec![0xaa], vec![0xbb]]);
    }

    #[test]
    fn parse_signature_header_tolerates_spaces_and_unknown_keys() {
        let header = SignatureHeader::parse("t=5, v1=0a, scheme=x").unwrap();
        assert_eq!(header.timestamp, 5);
    }

    #[test]
    fn parse_signature_header_empty() {
        assert_eq!(
            SignatureHeader::parse(""),
            Err(SignatureParseError::MissingHeader)
        );
    }

    #[test]
    fn parse_signature_header_missing_timestamp() {
        assert_eq!(
            SignatureHeader::parse("v1=abcd"),
            Err(SignatureParseError::MissingTimestamp)
        );
    }

    #[test]
    fn parse_signature_header_missing_v1() {
        assert_eq!(
            SignatureHeader::parse("t=1704067200,v0=abcd"),
            Err(SignatureParseError::MissingV1Signature)
        );
    }

    #[test]
    fn parse_signature_header_invalid_timestamp() {
        assert_eq!(
            SignatureHeader::parse("t=yesterday,v1=abcd"),
            Err(SignatureParseError::InvalidTimestamp)
        );
    }

    #[test]
    fn parse_signature_header_invalid_hex() {
        assert_eq!(
            SignatureHeader::parse("t=1,v1=zz"),
            Err(SignatureParseError::InvalidSignatureFormat)
        );
        assert_eq!(
            SignatureHeader::parse("t=1,v1=abc"),
            Err(SignatureParseError::InvalidSignatureFormat)
        );
    }

    #[test]
    fn parse_signature_header_rejects_element_without_equals() {
        assert!(matches!(
            SignatureHeader::parse("t=1,garbage"),
            Err(SignatureParseError::MalformedElement(_))
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Object Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_session_reads_metadata() {
        let session: StripeCheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test",
            "object": "checkout.session",
            "subscription": "sub_1",
            "metadata": {"clerkUserId": "u1", "planType": "monthly"}
        }))
        .unwrap();

        assert_eq!(session.user_id().as_deref(), Some("u1"));
        assert_eq!(session.plan_type().as_deref(), Some("monthly"));
        assert_eq!(session.subscription.as_deref(), Some("sub_1"));
    }

    #[test]
    fn checkout_session_accepts_user_id_key() {
        let session: StripeCheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test",
            "metadata": {"user_id": "u2"}
        }))
        .unwrap();
        assert_eq!(session.user_id().as_deref(), Some("u2"));
    }

    #[test]
    fn checkout_session_treats_blank_metadata_as_missing() {
        let session: StripeCheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test",
            "metadata": {"clerkUserId": "", "planType": " "}
        }))
        .unwrap();
        assert!(session.user_id().is_none());
        assert!(session.plan_type().is_none());
    }

    #[test]
    fn subscription_period_end_falls_back_to_item() {
        let sub: StripeSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "status": "active",
            "items": {"object": "list", "data": [
                {"id": "si_1", "price": {"id": "price_m"}, "current_period_end": 1706745600}
            ]}
        }))
        .unwrap();

        assert_eq!(sub.period_end(), Some(1706745600));
        assert_eq!(sub.first_item().map(|i| i.price.id.as_str()), Some("price_m"));
    }

    #[test]
    fn subscription_items_default_to_empty() {
        let sub: StripeSubscription =
            serde_json::from_value(serde_json::json!({"id": "sub_1", "status": "canceled"}))
                .unwrap();
        assert!(sub.first_item().is_none());
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn invoice_subscription_from_top_level() {
        let invoice: StripeInvoice = serde_json::from_value(serde_json::json!({
            "id": "in_1", "subscription": "sub_1"
        }))
        .unwrap();
        assert_eq!(invoice.subscription_id().as_deref(), Some("sub_1"));
    }

    #[test]
    fn invoice_subscription_from_parent_details() {
        let invoice: StripeInvoice = serde_json::from_value(serde_json::json!({
            "id": "in_1",
            "parent": {"subscription_details": {"subscription": "sub_2"}}
        }))
        .unwrap();
        assert_eq!(invoice.subscription_id().as_deref(), Some("sub_2"));
    }

    #[test]
    fn event_envelope_parses() {
        let event: StripeWebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"invoice.paid","created":1704067200,
                "data":{"object":{}},"livemode":true,"pending_webhooks":1}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "invoice.paid");
        assert!(event.livemode);
    }

    #[test]
    fn error_body_parses() {
        let body: StripeErrorBody = serde_json::from_str(
            r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such subscription: 'sub_x'"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.code.as_deref(), Some("resource_missing"));
    }
}
