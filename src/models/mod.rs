//! Data models
//!
//! This module contains the data structures shared by the store, the state
//! cache and the HTTP layer:
//! - The persisted `Article` entity and its create/update inputs
//! - Admin login request/response types

mod admin;
mod article;

pub use admin::{AdminUser, LoginRequest, LoginResponse};
pub use article::{
    sort_by_date_desc, Article, ArticleDraft, ArticlePatch, FilterMode, DEFAULT_CATEGORY,
};
