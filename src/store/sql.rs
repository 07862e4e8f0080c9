//! Relational article store
//!
//! One row per article in SQLite. Insertion order is the `seq` column, so the
//! "index" is simply `ORDER BY seq DESC` and a record can never be orphaned
//! or dangling.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

use super::{
    build_article, merge_patch, new_article_id, unique_slug, validate_draft, validate_patch,
    ArticleStore, ReconcileReport, StoreError,
};
use crate::config::DateLocale;
use crate::models::{Article, ArticleDraft, ArticlePatch};

const SELECT_COLUMNS: &str = "SELECT id, slug, title, content, excerpt, date, date_display, \
     cover_image, images, videos, category, tags, featured, created_at, updated_at, published \
     FROM articles";

/// SQLx-based article store
pub struct SqlxArticleStore {
    pool: SqlitePool,
    locale: DateLocale,
}

impl SqlxArticleStore {
    /// Create a new store; the schema must already exist
    pub fn new(pool: SqlitePool, locale: DateLocale) -> Self {
        Self { pool, locale }
    }

    /// Create a boxed store for use with dependency injection
    pub fn boxed(pool: SqlitePool, locale: DateLocale) -> Arc<dyn ArticleStore> {
        Arc::new(Self::new(pool, locale))
    }

    async fn write_row(&self, article: &Article, insert: bool) -> anyhow::Result<()> {
        let sql = if insert {
            r#"
            INSERT INTO articles (slug, title, content, excerpt, date, date_display, cover_image,
                images, videos, category, tags, featured, created_at, updated_at, published, id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        } else {
            r#"
            UPDATE articles SET slug = ?, title = ?, content = ?, excerpt = ?, date = ?,
                date_display = ?, cover_image = ?, images = ?, videos = ?, category = ?,
                tags = ?, featured = ?, created_at = ?, updated_at = ?, published = ?
            WHERE id = ?
            "#
        };

        sqlx::query(sql)
            .bind(&article.slug)
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.excerpt)
            .bind(&article.date)
            .bind(&article.date_display)
            .bind(&article.cover_image)
            .bind(serde_json::to_string(&article.images)?)
            .bind(serde_json::to_string(&article.videos)?)
            .bind(&article.category)
            .bind(serde_json::to_string(&article.tags)?)
            .bind(article.featured)
            .bind(article.created_at)
            .bind(article.updated_at)
            .bind(article.published)
            .bind(&article.id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to write article {}", article.id))?;
        Ok(())
    }
}

fn json_list(row: &SqliteRow, column: &str) -> anyhow::Result<Vec<String>> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in column {}", column))
}

fn row_to_article(row: &SqliteRow) -> anyhow::Result<Article> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: Option<DateTime<Utc>> = row.try_get("updated_at")?;

    Ok(Article {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        excerpt: row.try_get("excerpt")?,
        date: row.try_get("date")?,
        date_display: row.try_get("date_display")?,
        cover_image: row.try_get("cover_image")?,
        images: json_list(row, "images")?,
        videos: json_list(row, "videos")?,
        category: row.try_get("category")?,
        tags: json_list(row, "tags")?,
        featured: row.try_get("featured")?,
        created_at,
        updated_at,
        published: row.try_get("published")?,
    })
}

#[async_trait]
impl ArticleStore for SqlxArticleStore {
    async fn try_list_indexed(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query(&format!("{} ORDER BY seq DESC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_article(row) {
                Ok(article) => articles.push(article),
                Err(e) => tracing::warn!("Skipping unreadable article row: {:#}", e),
            }
        }
        Ok(articles)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get article by id")?;

        match row {
            Some(row) => Ok(Some(row_to_article(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, draft: ArticleDraft) -> Result<Article, StoreError> {
        validate_draft(&draft)?;

        let existing = self.try_list_indexed().await?;
        let id = new_article_id();
        let slug = unique_slug(&draft.title, &id, &existing);
        let article = build_article(id, slug, draft, self.locale)?;

        self.write_row(&article, true).await.map_err(|e| {
            tracing::error!("Failed to insert article: {:#}", e);
            StoreError::Backend(e)
        })?;

        tracing::debug!("Created article {} ({})", article.id, article.slug);
        Ok(article)
    }

    async fn update(&self, id: &str, patch: ArticlePatch) -> Result<Option<Article>, StoreError> {
        validate_patch(&patch)?;

        let Some(mut article) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let slug = match &patch.title {
            Some(title) => {
                let existing = self.try_list_indexed().await?;
                Some(unique_slug(title, id, &existing))
            }
            None => None,
        };
        merge_patch(&mut article, &patch, slug, self.locale)?;

        self.write_row(&article, false).await.map_err(|e| {
            tracing::error!("Failed to update article {}: {:#}", id, e);
            StoreError::Backend(e)
        })?;

        tracing::debug!("Updated article {}", id);
        Ok(Some(article))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete article {}", id))?;

        tracing::debug!("Deleted article {}", id);
        Ok(())
    }

    async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        Ok(ReconcileReport::default())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
