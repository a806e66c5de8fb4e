use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware};
use crate::routes::{drivers, health, payments, rides, trips};
use crate::services::lifecycle::LifecycleController;
use crate::services::location::{spawn_flush_workers, LocationPipeline};
use crate::services::psp::PspClient;
use crate::services::surge::SurgeEngine;
use cache::{CacheStore, GeoIndex};
use domain::services::{MockPaymentProvider, PaymentProvider};
use persistence::repositories::DriverRepository;
use shared::jwt::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Ephemeral TTL store: locks, counters, lookasides, idempotency cache.
    pub cache: Arc<CacheStore>,
    /// Tier-partitioned index of available drivers.
    pub geo: Arc<GeoIndex>,
    /// Demand/supply → multiplier.
    pub surge: Arc<SurgeEngine>,
    /// Ride state machine executor.
    pub lifecycle: Arc<LifecycleController>,
    /// Location ping fast path + flush queue.
    pub location: Arc<LocationPipeline>,
    /// External payment provider (HTTP adapter, or mock when unconfigured).
    pub provider: Arc<dyn PaymentProvider>,
    /// Bearer token verification.
    pub jwt: Arc<JwtService>,
}

impl AppState {
    /// Wire up shared state and start the location flush workers.
    pub fn new(config: Config, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(CacheStore::new());
        let geo = Arc::new(GeoIndex::new());

        let surge = Arc::new(SurgeEngine::new(
            Arc::clone(&cache),
            Arc::clone(&geo),
            config.surge.max_multiplier,
        ));

        let lifecycle = Arc::new(LifecycleController::new(
            pool.clone(),
            Arc::clone(&cache),
            Arc::clone(&geo),
        ));

        let (flush_tx, flush_rx) = mpsc::channel(config.location.queue_capacity);
        spawn_flush_workers(pool.clone(), flush_rx, config.location.flush_workers);

        let location = Arc::new(LocationPipeline::new(
            Arc::clone(&cache),
            Arc::clone(&geo),
            DriverRepository::new(pool.clone()),
            flush_tx,
        ));

        let provider: Arc<dyn PaymentProvider> = if config.psp.base_url.is_empty() {
            tracing::info!("PSP base URL not configured, using mock payment provider");
            Arc::new(MockPaymentProvider::new())
        } else {
            match PspClient::new(&config.psp) {
                Ok(client) => {
                    tracing::info!(base_url = %config.psp.base_url, "PSP client initialized");
                    Arc::new(client)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create PSP client, falling back to mock");
                    Arc::new(MockPaymentProvider::new())
                }
            }
        };

        let jwt = Arc::new(
            JwtService::new(
                &config.auth.secret_key,
                &config.auth.jwt_algorithm,
                config.auth.access_token_expire_minutes,
            )
            .expect("Invalid auth configuration"),
        );

        Self {
            pool,
            config,
            cache,
            geo,
            surge,
            lifecycle,
            location,
            provider,
            jwt,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics_handler))
        .route("/v1/drivers", post(drivers::register_driver))
        .route("/v1/drivers/:id/status", patch(drivers::update_status))
        .route("/v1/drivers/:id/location", post(drivers::update_location))
        .route("/v1/drivers/:id/accept", post(drivers::accept_ride))
        .route("/v1/rides", post(rides::create_ride))
        .route("/v1/rides/:id", get(rides::get_ride))
        .route("/v1/trips/:id/start", post(trips::start_trip))
        .route("/v1/trips/:id/pause", post(trips::pause_trip))
        .route("/v1/trips/:id/resume", post(trips::resume_trip))
        .route("/v1/trips/:id/end", post(trips::end_trip))
        .route("/v1/payments", post(payments::create_payment))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
