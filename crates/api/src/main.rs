//! Maplemart API - e-commerce backend binary.
//!
//! Serves the catalog, cart, checkout, and address endpoints on port 5000
//! (configurable). Storage is `PostgreSQL` by default; set
//! `MAPLEMART_BACKEND=memory` to run against process memory for local
//! development.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::get;
use axum::Router;
use sentry::integrations::tracing as sentry_tracing;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use maplemart_api::config::{ApiConfig, StoreBackend};
use maplemart_api::middleware::{rate_limit, session};
use maplemart_api::services::blobs::FsBlobStore;
use maplemart_api::services::notify::Notifier;
use maplemart_api::state::AppState;
use maplemart_api::store::{Stores, postgres};
use maplemart_api::routes;

/// Initialize Sentry error tracking and return a guard that must stay alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the CORS layer from the configured origin allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before the tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "maplemart_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Make sure the upload directory exists before anything can write to it
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");

    // Initialize the storage backend
    let (stores, pool) = match config.backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .expect("postgres backend requires a database URL");
            let pool = postgres::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            // NOTE: Schema migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p maplemart-cli -- migrate
            // The session store's own (idempotent) migration is the exception.
            session::migrate_session_store(&pool)
                .await
                .expect("Failed to migrate session store");

            (Stores::postgres(pool.clone()), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Running on the in-memory backend; data will not survive restarts");
            (Stores::memory(), None)
        }
    };

    let blobs = Arc::new(FsBlobStore::new(config.upload_dir.clone()));
    let notifier = match &config.email {
        Some(email) => Notifier::new(email).expect("Failed to configure SMTP notifier"),
        None => {
            tracing::info!("SMTP not configured; order notifications disabled");
            Notifier::disabled()
        }
    };

    let state = AppState::new(config.clone(), stores, blobs, notifier, pool.clone());

    // Build the router: rate-limited API routes, health checks, static uploads
    let app = Router::new()
        .merge(routes::routes().layer(rate_limit::api_rate_limiter()))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .with_state(state);

    // Session layer matches the storage backend
    let app = match &pool {
        Some(pool) => app.layer(session::postgres_session_layer(pool)),
        None => app.layer(session::memory_session_layer()),
    };

    let app = app
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("maplemart api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity (postgres backend) before returning OK.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.pool() {
        Some(pool) => match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        None => StatusCode::OK,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
