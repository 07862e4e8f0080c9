//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The uniform error envelope (`ApiError`)
//! - Bearer token authentication
//! - JSON/query extractors that reject with the error envelope

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Request, State,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::{AuthConfig, UploadConfig};
use crate::kv::KvBackend;
use crate::models::AdminUser;
use crate::services::{AdminAuth, ArticleCache, AuthError, MediaError, MediaStore};
use crate::store::{ArticleStore, StoreError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub cache: Arc<ArticleCache>,
    pub auth: Arc<AdminAuth>,
    pub media: Arc<MediaStore>,
    pub kv: Arc<dyn KvBackend>,
}

impl AppState {
    /// Wire the services around an article store; the cache starts empty
    pub fn new(
        store: Arc<dyn ArticleStore>,
        kv: Arc<dyn KvBackend>,
        auth_config: AuthConfig,
        upload_config: UploadConfig,
    ) -> Self {
        Self {
            cache: Arc::new(ArticleCache::new(store.clone())),
            store,
            auth: Arc::new(AdminAuth::new(auth_config)),
            media: Arc::new(MediaStore::new(upload_config)),
            kv,
        }
    }
}

/// Authenticated admin extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub user: AdminUser,
    pub token: String,
}

/// Error response: `{"success": false, "error": .., "code": ..}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new("METHOD_NOT_ALLOWED", "Method not allowed")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(message) => ApiError::validation_error(message),
            StoreError::Backend(e) => {
                tracing::error!("Article store failure: {:#}", e);
                ApiError::internal_error(format!("Storage backend error: {:#}", e))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::unauthorized(e.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Storage(e) => {
                tracing::error!("Media storage failure: {:#}", e);
                ApiError::internal_error("Failed to save file")
            }
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(format!("Invalid query: {}", rejection.body_text()))
    }
}

/// `Json` extractor that rejects with the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor that rejects with the error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Extract bearer token from request
fn extract_bearer_token(request: &Request) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.auth.validate(&token)?;

    request
        .extensions_mut()
        .insert(AuthenticatedAdmin { user, token });
    Ok(next.run(request).await)
}

/// Fallback for a known path with an unsupported method
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Fallback for unknown API paths
pub async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}
