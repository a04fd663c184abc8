//! HTTP handlers for billing endpoints.
//!
//! Thin glue between axum and the billing command/query handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::dto::{
    ChangePlanRequest, CheckoutRequest, CheckoutResponse, PlanResponse, ProcessorSubscription,
    SubscriptionStatusResponse, UnsubscribeResponse,
};
use crate::adapters::http::error::ErrorResponse;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ChangePlanCommand, ChangePlanHandler,
    CheckoutUrls, CreateProfileCommand, CreateProfileHandler, GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery, HandleWebhookCommand, HandleWebhookHandler, ListPlansHandler,
    StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::billing::{BillingError, PlanCatalog};
use crate::ports::{PaymentGateway, ProfileStore};

/// Header carrying the processor's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub profile_store: Arc<dyn ProfileStore>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub catalog: Arc<PlanCatalog>,
    pub checkout_urls: CheckoutUrls,
}

impl BillingAppState {
    pub fn new(
        profile_store: Arc<dyn ProfileStore>,
        payment_gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<PlanCatalog>,
        checkout_urls: CheckoutUrls,
    ) -> Self {
        Self {
            profile_store,
            payment_gateway,
            catalog,
            checkout_urls,
        }
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(self.profile_store.clone(), self.payment_gateway.clone())
    }

    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.payment_gateway.clone(),
            self.catalog.clone(),
            self.checkout_urls.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.profile_store.clone(), self.payment_gateway.clone())
    }

    pub fn change_plan_handler(&self) -> ChangePlanHandler {
        ChangePlanHandler::new(
            self.profile_store.clone(),
            self.payment_gateway.clone(),
            self.catalog.clone(),
        )
    }

    pub fn create_profile_handler(&self) -> CreateProfileHandler {
        CreateProfileHandler::new(self.profile_store.clone())
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.profile_store.clone())
    }

    pub fn list_plans_handler(&self) -> ListPlansHandler {
        ListPlansHandler::new(self.catalog.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhook - Processor lifecycle events
///
/// Answers 200 with an empty body once the signature checks out, whatever
/// happened to the individual event.
pub async fn handle_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, BillingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook rejected: missing signature header");
            BillingError::validation(SIGNATURE_HEADER, "missing signature header")
        })?;

    let cmd = HandleWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };
    let outcome = state.webhook_handler().handle(cmd).await?;
    tracing::debug!(?outcome, "Webhook acknowledged");

    Ok(StatusCode::OK)
}

// ════════════════════════════════════════════════════════════════════════════════
// Commands
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout - Start a hosted checkout
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    let Json(request) = payload.map_err(body_error)?;

    let cmd = StartCheckoutCommand {
        user,
        plan_type: request.plan_type,
        requested_user_id: request.user_id,
        email: request.email,
    };
    let result = state.start_checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutResponse { url: result.url }))
}

/// POST /api/profile - Create the caller's profile if missing
pub async fn create_profile(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SubscriptionStatusResponse>, BillingApiError> {
    let cmd = CreateProfileCommand { user_id: user.id };
    let result = state.create_profile_handler().handle(cmd).await?;

    Ok(Json(SubscriptionStatusResponse::from(&result.profile)))
}

/// POST /api/profile/change-plan - Swap the plan of the active subscription
pub async fn change_plan(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<ChangePlanRequest>, JsonRejection>,
) -> Result<Json<SubscriptionStatusResponse>, BillingApiError> {
    let Json(request) = payload.map_err(body_error)?;

    let cmd = ChangePlanCommand {
        user_id: user.id,
        new_plan: request.new_plan,
    };
    let result = state.change_plan_handler().handle(cmd).await?;

    Ok(Json(SubscriptionStatusResponse::from(&result.profile)))
}

/// POST /api/profile/unsubscribe - Cancel at period end
pub async fn unsubscribe(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UnsubscribeResponse>, BillingApiError> {
    let cmd = CancelSubscriptionCommand { user_id: user.id };
    let result = state.cancel_subscription_handler().handle(cmd).await?;

    Ok(Json(UnsubscribeResponse {
        subscription: ProcessorSubscription::from(&result.subscription),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Queries
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/profile/subscription-status
pub async fn subscription_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<SubscriptionStatusResponse>, BillingApiError> {
    let query = GetSubscriptionStatusQuery { user_id: user.id };
    let result = state.subscription_status_handler().handle(query).await?;

    Ok(Json(SubscriptionStatusResponse::from(&result.profile)))
}

/// GET /api/plans - Public plan catalog
pub async fn list_plans(State(state): State<BillingAppState>) -> Json<Vec<PlanResponse>> {
    let result = state.list_plans_handler().handle();
    Json(result.plans.iter().map(PlanResponse::from).collect())
}

fn body_error(rejection: JsonRejection) -> BillingError {
    BillingError::validation("body", rejection.body_text())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::InvalidSignature(_)
            | BillingError::InvalidPlan(_)
            | BillingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            BillingError::Unauthorized => StatusCode::UNAUTHORIZED,
            BillingError::ProfileNotFound(_) | BillingError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::NoActiveSubscription(_) => StatusCode::CONFLICT,
            BillingError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            BillingError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal error".to_string()
            }
            BillingError::Gateway { message, .. } => {
                tracing::error!(error = %message, "Payment provider request failed");
                self.0.to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse::new(self.0.code().to_string(), message).into_response_with(status)
    }
}
