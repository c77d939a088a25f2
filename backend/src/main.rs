use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use ridepool::constants::{EXPIRY_SWEEP_INTERVAL_SECS, MATCHING_INTERVAL_SECS};
use ridepool::handlers::{self, AppState};
use ridepool::lifecycle::cleanup_expired_proposals;
use ridepool::matching::{run_matching_batch, MatchingConfig};
use ridepool::services::notifier::{LogNotifier, Notifier, WebhookNotifier};
use ridepool::services::payments::{MockPaymentProvider, PaymentProvider};
use ridepool::store::memory::InMemoryStore;
use ridepool::store::postgres::PgStore;
use ridepool::store::Store;
use ridepool::utils::config::StoreBackend;
use ridepool::{get_db_pool, utils, Config, DatabaseConfig};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let port = config.port;

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };
    let payments: Arc<dyn PaymentProvider> = Arc::new(MockPaymentProvider);
    let matching = Arc::new(MatchingConfig::default());

    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("running with the in-memory store, data is not durable");
            let state = AppState {
                store: Arc::new(InMemoryStore::new()),
                payments,
                notifier,
                matching,
            };
            // The matching worker binary only reaches Postgres, so the
            // periodic tick and expiry sweep run in-process here.
            spawn_background_jobs(&state);
            serve(state, port).await
        }
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = get_db_pool(&db_config).await?;

            // Run migrations
            ridepool::store::migrations::run_migrations(&pool).await?;

            let state = AppState {
                store: Arc::new(PgStore::new(pool)),
                payments,
                notifier,
                matching,
            };
            serve(state, port).await
        }
    }
}

fn spawn_background_jobs<S: Store>(state: &AppState<S>) {
    let matching_state = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(MATCHING_INTERVAL_SECS));
        loop {
            tick.tick().await;
            if let Err(e) = run_matching_batch(
                matching_state.store.as_ref(),
                matching_state.notifier.as_ref(),
                &matching_state.matching,
            )
            .await
            {
                tracing::error!("matching tick failed: {}", e);
            }
        }
    });

    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(EXPIRY_SWEEP_INTERVAL_SECS));
        loop {
            tick.tick().await;
            if let Err(e) = cleanup_expired_proposals(sweep_state.store.as_ref(), Utc::now()).await
            {
                tracing::error!("expiry sweep failed: {}", e);
            }
        }
    });
}

async fn serve<S: Store>(state: AppState<S>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router<S: Store>(state: AppState<S>) -> Router {
    let cors_layer = create_cors_layer();

    Router::new()
        .route("/health", get(health_check))
        // Booking intake
        .route("/api/requests", post(handlers::requests::create_request::<S>))
        .route("/api/requests/{id}", get(handlers::requests::get_request::<S>))
        .route(
            "/api/requests/{id}/proposal",
            get(handlers::requests::get_active_proposal::<S>),
        )
        // Proposal decisions
        .route(
            "/api/proposals/{id}/accept",
            post(handlers::proposals::accept_proposal::<S>),
        )
        .route(
            "/api/proposals/{id}/reject",
            post(handlers::proposals::reject_proposal::<S>),
        )
        .layer(cors_layer)
        .with_state(state)
}

fn create_cors_layer() -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
