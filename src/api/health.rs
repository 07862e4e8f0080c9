//! Health check
//!
//! GET /api/health writes, reads back and deletes a probe key on the
//! key-value backend.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::api::middleware::AppState;
use crate::kv::KvBackend;

/// Key written by the probe
pub const HEALTH_CHECK_KEY: &str = "health-check";

pub fn public_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Round-trip a probe value; `Ok(true)` when it read back intact
async fn probe(kv: &dyn KvBackend) -> anyhow::Result<bool> {
    let value = json!({ "timestamp": Utc::now().to_rfc3339() });
    kv.set(HEALTH_CHECK_KEY, &value).await?;
    let retrieved = kv.get(HEALTH_CHECK_KEY).await?;
    kv.delete(HEALTH_CHECK_KEY).await?;
    Ok(retrieved.as_ref() == Some(&value))
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = Utc::now().to_rfc3339();
    match probe(state.kv.as_ref()).await {
        Ok(test_successful) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "timestamp": timestamp,
                "kv": {
                    "backend": state.kv.name(),
                    "connected": true,
                    "testSuccessful": test_successful,
                },
                "store": state.store.name(),
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "ERROR",
                    "timestamp": timestamp,
                    "kv": {
                        "backend": state.kv.name(),
                        "connected": false,
                        "error": format!("{:#}", e),
                    },
                    "store": state.store.name(),
                })),
            )
        }
    }
}
