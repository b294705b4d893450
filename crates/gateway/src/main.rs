//! Peerview API Gateway
//!
//! The single entry point for the journal submission API.
//! Handles:
//! - Authentication and role-gated authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use peerview_common::{
    auth::TokenManager,
    config::AppConfig,
    db::{DbPool, Repository},
    mail::{HttpMailer, MailSender},
    metrics::LATENCY_BUCKETS,
    storage::{HttpObjectStore, ObjectStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub tokens: Arc<TokenManager>,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn MailSender>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Peerview API Gateway v{}", peerview_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                LATENCY_BUCKETS,
            )?
            .install()?;
        info!(
            port = config.observability.metrics_port,
            "Prometheus exporter listening"
        );
    }
    peerview_common::metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    let repo = Repository::new(db);

    // Collaborators and the token service
    let tokens = Arc::new(TokenManager::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));
    let store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(config.storage.clone())?);
    let mailer: Arc<dyn MailSender> = Arc::new(HttpMailer::new(config.mail.clone())?);

    // Create app state
    let state = AppState {
        config: config.clone(),
        repo,
        tokens,
        store,
        mailer,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = build_cors(state.config.server.cors_origin.as_deref());

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let limiter = middleware::rate_limit::create_rate_limiter(&state.config.rate_limit);

    // Public surface: health, registration, and the readable catalogue
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/submit", post(handlers::submissions::submit))
        .route("/journals", get(handlers::submissions::list))
        .route("/journals/{id}", get(handlers::submissions::get_one));

    // Any authenticated caller
    let authed_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/reviewers", get(handlers::auth::reviewers))
        .route("/stats", get(handlers::submissions::stats))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Reviewer or admin
    let review_routes = Router::new()
        .route("/review/{id}", get(handlers::submissions::get_for_review))
        .route("/{id}/status", put(handlers::submissions::update_status))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_review_role,
        ));

    // Admin only
    let admin_routes = Router::new()
        .route("/{id}", delete(handlers::submissions::delete_submission))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    // Compose the app
    let mut app = Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .merge(review_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(from_fn(middleware::track_requests));

    if state.config.rate_limit.enabled {
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit,
        ));
    }

    app.with_state(state)
}

/// CORS restricted to the configured frontend origin, permissive when unset
fn build_cors(origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => base.allow_origin(origin),
        None => base.allow_origin(Any),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
