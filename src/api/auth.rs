//! Authentication API endpoints
//!
//! - POST /api/auth/login - Admin login
//! - POST /api/auth/logout - Invalidate the current token (admin)

use axum::{extract::State, response::IntoResponse, routing::post, Extension, Router};

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedAdmin};
use crate::api::responses::ok;
use crate::models::LoginRequest;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.auth.login(&request)?;
    Ok(ok(response))
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> impl IntoResponse {
    state.auth.logout(&admin.token);
    ok(())
}
