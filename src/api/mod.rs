//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api` and answer with the
//! `{"success": .., "data" | "error": ..}` envelope:
//! - Article endpoints (store pass-through)
//! - News endpoints (article cache views)
//! - Auth, upload and maintenance endpoints
//! - Health check
//!
//! Uploaded media is served from `upload.public_base_url` when that is a
//! local path.

pub mod articles;
pub mod auth;
pub mod health;
pub mod maintenance;
pub mod middleware;
pub mod news;
pub mod responses;
pub mod upload;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Routes that need an admin session
    let admin_routes = Router::new()
        .merge(articles::admin_router())
        .merge(news::admin_router())
        .merge(auth::admin_router())
        .merge(upload::admin_router(state.media.max_upload_size()))
        .merge(maintenance::admin_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(articles::public_router())
        .merge(news::public_router())
        .merge(auth::public_router())
        .merge(health::public_router())
        .merge(admin_routes)
        .method_not_allowed_fallback(middleware::method_not_allowed)
        .fallback(middleware::not_found)
}

fn cors_layer(cors_origin: &str) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors_origin.trim() == "*" {
        return Ok(cors.allow_origin(Any));
    }
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin '{}'", cors_origin))?;
    Ok(cors.allow_origin(origin))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let mut router = Router::new().nest("/api", build_api_router(state.clone()));

    let base = state.media.public_base_url().trim_end_matches('/');
    if base.starts_with('/') && base.len() > 1 {
        router = router.nest_service(base, ServeDir::new(state.media.root()));
    } else {
        tracing::info!(
            "Uploads are served externally from '{}'",
            state.media.public_base_url()
        );
    }

    Ok(router
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
