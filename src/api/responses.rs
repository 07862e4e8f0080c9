//! Shared API response types
//!
//! Every successful response uses the `{"success": true, "data": ..}` envelope.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::models::Article;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// 200 with `data`
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// 201 with `data`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// Article list with its length
#[derive(Debug, Serialize)]
pub struct ArticleList {
    pub articles: Vec<Article>,
    pub total: usize,
}

impl From<Vec<Article>> for ArticleList {
    fn from(articles: Vec<Article>) -> Self {
        Self {
            total: articles.len(),
            articles,
        }
    }
}
