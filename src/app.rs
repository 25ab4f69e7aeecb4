use crate::errors::AppError;
use crate::handlers::{self, AppState};
use crate::webhook_handler;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request size limit for API routes (1MB).
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// All `/api/v1` routes. Callers add their own protection layers.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Catalog
        .route("/api/v1/services", get(handlers::list_services))
        .route("/api/v1/packages", get(handlers::list_packages))
        // Leads
        .route("/api/v1/leads", post(handlers::create_lead))
        .route("/api/v1/leads/qualify", post(handlers::qualify_lead))
        // Sales documents
        .route("/api/v1/proposals", post(handlers::create_proposal))
        .route("/api/v1/licenses", post(handlers::create_license))
        .route("/api/v1/licenses/verify", post(handlers::verify_license))
        // Artifacts & pipeline
        .route("/api/v1/artifacts/:id", get(handlers::get_artifact))
        .route("/api/v1/dashboard", get(handlers::dashboard))
        // n8n workflow triggers
        .route("/api/v1/webhooks/n8n", post(webhook_handler::n8n_webhook))
}

fn assemble(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    // Health check bypasses rate limiting
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Full API without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    assemble(
        state,
        api_routes().layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES)),
    )
}

/// Full API as served: `/api/v1` routes are rate limited per client IP
/// (burst of 20), `/health` is not.
pub fn rate_limited_router(state: Arc<AppState>) -> Result<Router, AppError> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| {
                AppError::InternalError("Invalid rate limiter configuration".to_string())
            })?,
    );

    let protected_routes = api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    Ok(assemble(state, protected_routes))
}
