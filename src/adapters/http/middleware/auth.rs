//! Authentication middleware and extractor for axum.
//!
//! ```text
//! Request → auth_middleware → AuthenticatedUser in extensions
//!                                      ↓
//!                              Handler → RequireAuth reads it back
//! ```
//!
//! The middleware only rejects tokens that are present and bad. Routes
//! that need a caller ask for `RequireAuth`, so a request without a token
//! fails at the extractor with the same 401 body.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ErrorResponse;
use crate::domain::foundation::{AuthError, AuthenticatedUser, ErrorCode};
use crate::ports::SessionValidator;

/// Auth middleware state.
pub type AuthState = Arc<dyn SessionValidator>;

/// Returns the token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates the bearer token and injects `AuthenticatedUser`.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "Session validated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => auth_error_response(&err),
    }
}

fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::ServiceUnavailable(msg) => {
            tracing::error!(error = %msg, "Session validation unavailable");
            ErrorResponse::new("AUTH_UNAVAILABLE", "Authentication service unavailable")
                .into_response_with(StatusCode::SERVICE_UNAVAILABLE)
        }
        other => {
            tracing::debug!(error = %other, "Session rejected");
            ErrorResponse::new(ErrorCode::Unauthorized.to_string(), other.to_string())
                .into_response_with(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Extractor for routes that need a signed-in caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No valid session token was provided.
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => {
                ErrorResponse::new(ErrorCode::Unauthorized.to_string(), "Authentication required")
                    .into_response_with(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
