//! HTTP routes for the notes gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{BcryptPasswordHasher, PasswordHasher, PrincipalResolver, TokenCodec};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::handlers;
use crate::middleware::{admission_control, http_metrics_middleware, RequestPipeline};
use crate::rate_limit::{RateLimitConfig, RateLimiterRegistry};
use crate::repositories::{
    CredentialStore, InMemoryCredentialStore, InMemoryNoteStore, NoteStore,
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Issues login tokens and verifies bearer tokens.
    pub codec: Arc<TokenCodec>,

    /// Registered principals.
    pub credentials: Arc<dyn CredentialStore>,

    /// Note persistence.
    pub notes: Arc<dyn NoteStore>,

    /// Password hashing for registration and login.
    pub hasher: Arc<dyn PasswordHasher>,

    /// Per-identity admission control.
    pub rate_limiter: Arc<RateLimiterRegistry>,

    /// Time source for tokens, admission and note expiry.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the gateway from configuration with in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the signing secret cannot key the codec.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let rate_limiter = RateLimiterRegistry::new(RateLimitConfig::from_config(config));
        rate_limiter.set_enabled(config.rate_limit_enabled);

        Ok(Self {
            codec: Arc::new(TokenCodec::from_config(config)?),
            credentials: Arc::new(InMemoryCredentialStore::new()),
            notes: Arc::new(InMemoryNoteStore::new()),
            hasher: Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost)),
            rate_limiter: Arc::new(rate_limiter),
            clock,
        })
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/auth/register`, `/api/auth/login` - public
/// - `/api/me`, `/api/notes/...` - behind the admission pipeline
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let pipeline = Arc::new(RequestPipeline::new(
        PrincipalResolver::new(state.codec.clone(), state.credentials.clone()),
        state.rate_limiter.clone(),
        state.clock.clone(),
    ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::get_me))
        .route("/api/notes", post(handlers::create_note))
        .route("/api/notes/latest", get(handlers::latest_notes))
        .route(
            "/api/notes/:id",
            put(handlers::update_note).delete(handlers::delete_note),
        )
        .route_layer(middleware::from_fn_with_state(pipeline, admission_control))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
