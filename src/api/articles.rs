//! Article API endpoints
//!
//! - GET /api/articles - List articles (`?published_only=true`)
//! - GET /api/articles/{id} - Get article by id
//! - GET /api/articles/slug/{slug} - Get article by slug
//! - GET /api/articles/featured - Featured articles
//! - GET /api/articles/recent - Most recent articles (`?limit=n`)
//! - GET /api/articles/search - Search (`?q=`)
//! - POST /api/articles - Create article (admin)
//! - PUT /api/articles/{id} - Update article (admin)
//! - DELETE /api/articles/{id} - Delete article (admin)
//!
//! Reads go straight to the article store. Mutations go through the article
//! cache so the cached collection stays in step.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, ApiQuery, AppState};
use crate::api::responses::{created, ok, ArticleList};
use crate::models::{ArticleDraft, ArticlePatch};

/// Default number of articles in `/articles/recent`
const DEFAULT_RECENT_LIMIT: usize = 5;

/// Query parameters for listing articles
#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    #[serde(default)]
    pub published_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Public article routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/featured", get(list_featured))
        .route("/articles/recent", get(list_recent))
        .route("/articles/search", get(search_articles))
        .route("/articles/slug/{slug}", get(get_article_by_slug))
        .route("/articles/{id}", get(get_article_by_id))
}

/// Article routes that require an admin session
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article))
        .route("/articles/{id}", put(update_article).delete(delete_article))
}

/// GET /api/articles
async fn list_articles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> impl IntoResponse {
    let mut articles = state.store.list_all().await;
    if query.published_only {
        articles.retain(|a| a.published);
    }
    ok(ArticleList::from(articles))
}

/// GET /api/articles/featured
async fn list_featured(State(state): State<AppState>) -> impl IntoResponse {
    ok(ArticleList::from(state.store.list_featured().await))
}

/// GET /api/articles/recent
async fn list_recent(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> impl IntoResponse {
    ok(ArticleList::from(state.store.list_recent(query.limit).await))
}

/// GET /api/articles/search
async fn search_articles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> impl IntoResponse {
    ok(ArticleList::from(state.store.search(&query.q).await))
}

/// GET /api/articles/{id}
async fn get_article_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .store
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(ok(article))
}

/// GET /api/articles/slug/{slug}
async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .store
        .get_by_slug(&slug)
        .await
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(ok(article))
}

/// POST /api/articles
async fn create_article(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<ArticleDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.cache.create(draft).await?;
    tracing::info!("Article created: {} ({})", article.id, article.slug);
    Ok(created(article))
}

/// PUT /api/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ArticlePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .cache
        .update(&id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    tracing::info!("Article updated: {}", article.id);
    Ok(ok(article))
}

/// DELETE /api/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Article not found"));
    }
    state.cache.delete(&id).await?;
    tracing::info!("Article deleted: {}", id);
    Ok(ok(()))
}
