//! News feed endpoints backed by the article cache
//!
//! - GET /api/news - Cached view (`?q=..&filter=all|recent|popular`)
//! - POST /api/news/refresh - Reload the cache from the store (admin)

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiQuery, AppState};
use crate::api::responses::ok;
use crate::models::{Article, FilterMode};

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub filter: FilterMode,
}

/// Derived view plus the cache status
#[derive(Debug, Serialize)]
pub struct NewsView {
    pub articles: Vec<Article>,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/news", get(get_news))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/news/refresh", post(refresh_news))
}

/// GET /api/news
async fn get_news(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NewsQuery>,
) -> impl IntoResponse {
    let articles = state.cache.view(query.q.as_deref(), query.filter);
    let status = state.cache.snapshot();
    ok(NewsView {
        total: articles.len(),
        articles,
        loading: status.loading,
        error: status.error,
    })
}

/// POST /api/news/refresh
async fn refresh_news(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.cache.refresh().await)
}
