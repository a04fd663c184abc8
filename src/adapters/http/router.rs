//! Top-level axum router.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::billing::{public_routes, session_routes, BillingAppState};
use super::middleware::{auth_middleware, AuthState};
use crate::config::ServerConfig;

/// Billing API plus `/health`, without transport layers.
///
/// Session routes sit behind `auth_middleware`; the webhook and the plan
/// catalog do not.
pub fn api_router(state: BillingAppState, validator: AuthState) -> Router {
    let session = session_routes().route_layer(middleware::from_fn_with_state(
        validator,
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", session.merge(public_routes()))
        .with_state(state)
}

/// Adds request ids, tracing, CORS and the request timeout.
pub fn with_http_layers(router: Router, config: &ServerConfig) -> Router {
    router
        .layer(cors_layer(config))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health() -> &'static str {
    "ok"
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() && !config.is_production() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
