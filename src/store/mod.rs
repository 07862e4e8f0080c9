//! Article store
//!
//! Durable mapping from article id to article document, with a single
//! ordered collection view.
//!
//! - `KvArticleStore` - article index + one record per article in a key-value
//!   backend (default)
//! - `SqlxArticleStore` - one SQLite row per article
//!
//! Read paths (`list_all`, `get_by_slug`, `search`, ...) never fail: backend
//! errors are logged and degrade to an empty or absent result. Write paths
//! surface errors to the caller. "Not found" is always `None`, never an error.

pub mod kv;
pub mod sql;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, DateLocale, StoreDriver};
use crate::kv::KvBackend;
use crate::models::{
    sort_by_date_desc, Article, ArticleDraft, ArticlePatch, DEFAULT_CATEGORY,
};
use crate::services::date::{format_date_display, parse_date, to_storage, today};
use crate::services::slug::generate_slug;

pub use kv::KvArticleStore;
pub use sql::SqlxArticleStore;

/// Number of id characters appended to a colliding slug
const SLUG_SUFFIX_LEN: usize = 6;

/// Error types for article store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport or storage failure
    #[error("Backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Result of a reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Records with no index entry; left in place
    pub orphaned: Vec<String>,
    /// Index entries with no record; pruned from the index
    pub dangling: Vec<String>,
}

/// Article store trait
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// All articles in index order (newest inserted first)
    async fn try_list_indexed(&self) -> Result<Vec<Article>, StoreError>;

    /// Get article by id
    async fn get_by_id(&self, id: &str) -> Result<Option<Article>, StoreError>;

    /// Create an article from a draft
    async fn create(&self, draft: ArticleDraft) -> Result<Article, StoreError>;

    /// Merge `patch` over an existing article; `None` if it does not exist
    async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>, StoreError>;

    /// Delete an article
    ///
    /// Idempotent: deleting a missing article succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Find orphaned records and prune dangling index entries
    async fn reconcile(&self) -> Result<ReconcileReport, StoreError>;

    /// Short store name used in logs
    fn name(&self) -> &'static str;

    /// All articles sorted by `date` descending, ties in index order
    async fn try_list_all(&self) -> Result<Vec<Article>, StoreError> {
        let mut articles = self.try_list_indexed().await?;
        sort_by_date_desc(&mut articles);
        Ok(articles)
    }

    /// Like `try_list_all`, but an unavailable backend yields an empty list
    async fn list_all(&self) -> Vec<Article> {
        match self.try_list_all().await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("Listing articles failed, serving empty list: {}", e);
                Vec::new()
            }
        }
    }

    /// First article with this slug, in index order
    async fn get_by_slug(&self, slug: &str) -> Option<Article> {
        match self.try_list_indexed().await {
            Ok(articles) => articles.into_iter().find(|a| a.slug == slug),
            Err(e) => {
                tracing::warn!("Slug lookup for '{}' failed: {}", slug, e);
                None
            }
        }
    }

    /// Case-insensitive search; a blank query matches nothing
    async fn search(&self, query: &str) -> Vec<Article> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.list_all()
            .await
            .into_iter()
            .filter(|a| a.matches_query(&needle))
            .collect()
    }

    /// Featured articles, newest first
    async fn list_featured(&self) -> Vec<Article> {
        self.list_all()
            .await
            .into_iter()
            .filter(|a| a.featured)
            .collect()
    }

    /// The `limit` most recent articles by date
    async fn list_recent(&self, limit: usize) -> Vec<Article> {
        let mut articles = self.list_all().await;
        articles.truncate(limit);
        articles
    }
}

/// Opaque, never-reused article id
pub(crate) fn new_article_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn require_text(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_date(value: &str) -> Result<chrono::NaiveDate, StoreError> {
    parse_date(value).ok_or_else(|| {
        StoreError::Validation(format!(
            "Invalid date '{}': expected YYYY-MM-DD or RFC 3339",
            value
        ))
    })
}

/// Check required fields of a draft
pub(crate) fn validate_draft(draft: &ArticleDraft) -> Result<(), StoreError> {
    require_text("Title", &draft.title)?;
    require_text("Content", &draft.content)?;
    if let Some(date) = &draft.date {
        require_date(date)?;
    }
    Ok(())
}

/// Check the fields a patch provides
pub(crate) fn validate_patch(patch: &ArticlePatch) -> Result<(), StoreError> {
    if let Some(title) = &patch.title {
        require_text("Title", title)?;
    }
    if let Some(content) = &patch.content {
        require_text("Content", content)?;
    }
    if let Some(date) = &patch.date {
        require_date(date)?;
    }
    Ok(())
}

/// Pick a slug for `id`, suffixing it when a different article already uses it
pub(crate) fn unique_slug<'a>(
    title: &str,
    id: &str,
    existing: impl IntoIterator<Item = &'a Article>,
) -> String {
    let base = generate_slug(title);
    let taken = existing
        .into_iter()
        .any(|other| other.id != id && other.slug == base);
    if taken {
        let suffix: String = id.chars().take(SLUG_SUFFIX_LEN).collect();
        format!("{}-{}", base, suffix)
    } else {
        base
    }
}

/// Build a new article from a validated draft
pub(crate) fn build_article(
    id: String,
    slug: String,
    draft: ArticleDraft,
    locale: DateLocale,
) -> Result<Article, StoreError> {
    let date = match &draft.date {
        Some(date) => require_date(date)?,
        None => today(),
    };

    Ok(Article {
        id,
        slug,
        title: draft.title,
        content: draft.content,
        excerpt: draft.excerpt.unwrap_or_default(),
        date: to_storage(date),
        date_display: format_date_display(date, locale),
        cover_image: draft.cover_image,
        images: draft.images.unwrap_or_default(),
        videos: draft.videos.unwrap_or_default(),
        category: draft
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        tags: draft.tags.unwrap_or_default(),
        featured: draft.featured.unwrap_or(false),
        created_at: Utc::now(),
        updated_at: None,
        published: true,
    })
}

/// Apply a validated patch, recomputing derived fields
///
/// `slug` is the already disambiguated slug when the patch carries a title.
pub(crate) fn merge_patch(
    existing: &mut Article,
    patch: &ArticlePatch,
    slug: Option<String>,
    locale: DateLocale,
) -> Result<(), StoreError> {
    existing.apply_patch(patch);
    if existing.category.trim().is_empty() {
        existing.category = DEFAULT_CATEGORY.to_string();
    }

    if let Some(slug) = slug {
        existing.slug = slug;
    }
    if let Some(date) = &patch.date {
        let date = require_date(date)?;
        existing.date = to_storage(date);
        existing.date_display = format_date_display(date, locale);
    }
    existing.updated_at = Some(Utc::now());
    Ok(())
}

/// Welcome article created on first start when seeding is enabled
pub fn default_article_draft() -> ArticleDraft {
    ArticleDraft {
        title: "Welcome to Sustainable Politics".to_string(),
        content: "This is our first article about sustainable politics and environmental policies. \
                  We believe in creating a better future through informed political discourse \
                  and sustainable practices."
            .to_string(),
        excerpt: Some("Welcome to our platform for sustainable political discourse.".to_string()),
        cover_image: Some("/sustainable-politics-news.jpg".to_string()),
        tags: Some(vec![
            "welcome".to_string(),
            "sustainability".to_string(),
            "politics".to_string(),
        ]),
        featured: Some(true),
        ..ArticleDraft::default()
    }
}

/// Create the welcome article if the store has no articles
///
/// Returns the created article, or `None` when the store already had content.
pub async fn seed_default_article(store: &dyn ArticleStore) -> Result<Option<Article>, StoreError> {
    if !store.try_list_indexed().await?.is_empty() {
        return Ok(None);
    }
    let article = store.create(default_article_draft()).await?;
    tracing::info!("Seeded default article {}", article.id);
    Ok(Some(article))
}

/// Create the configured article store
pub async fn create_store(
    config: &Config,
    kv: Arc<dyn KvBackend>,
) -> anyhow::Result<Arc<dyn ArticleStore>> {
    let locale = config.store.date_locale;
    match config.store.driver {
        StoreDriver::Kv => Ok(KvArticleStore::boxed(kv, locale)),
        StoreDriver::Sqlite => {
            let pool = crate::db::create_pool(&config.database).await?;
            crate::db::ensure_schema(&pool).await?;
            Ok(SqlxArticleStore::boxed(pool, locale))
        }
    }
}
