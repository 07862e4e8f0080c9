//! Maintenance endpoints (admin)
//!
//! - POST /api/maintenance/reconcile - Report orphaned records and prune
//!   dangling index entries

use axum::{extract::State, response::IntoResponse, routing::post, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ok;

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/maintenance/reconcile", post(reconcile))
}

/// POST /api/maintenance/reconcile
async fn reconcile(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.store.reconcile().await?;
    tracing::info!(
        "Reconcile via {}: {} orphaned, {} dangling",
        state.store.name(),
        report.orphaned.len(),
        report.dangling.len()
    );
    Ok(ok(report))
}
