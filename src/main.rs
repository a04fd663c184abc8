//! Meal Planner API server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meal_planner::adapters::auth::JwtSessionValidator;
use meal_planner::adapters::http::{api_router, with_http_layers, BillingAppState};
use meal_planner::adapters::memory::InMemoryProfileStore;
use meal_planner::adapters::postgres::{self, PostgresProfileStore};
use meal_planner::adapters::stripe::{StripeConfig, StripePaymentGateway};
use meal_planner::application::handlers::billing::CheckoutUrls;
use meal_planner::config::AppConfig;
use meal_planner::domain::billing::PlanCatalog;
use meal_planner::ports::{ProfileStore, SessionValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting meal planner API"
    );

    let profile_store: Arc<dyn ProfileStore> = match &config.database {
        Some(database) => {
            let pool = postgres::connect(database).await?;
            tracing::info!("Database connection established");
            if database.run_migrations {
                postgres::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");
            }
            Arc::new(PostgresProfileStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured, profiles are kept in memory");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    let payment_gateway = Arc::new(StripePaymentGateway::new(StripeConfig::from(
        &config.payment,
    )));
    let validator: Arc<dyn SessionValidator> = Arc::new(JwtSessionValidator::new(&config.auth));
    let catalog = Arc::new(PlanCatalog::new(config.payment.price_ids()));
    let checkout_urls = CheckoutUrls {
        success_url: config.server.checkout_success_url(),
        cancel_url: config.server.checkout_cancel_url(),
    };

    let state = BillingAppState::new(profile_store, payment_gateway, catalog, checkout_urls);
    let app = with_http_layers(api_router(state, validator), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over `server.log_level`. JSON output in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
