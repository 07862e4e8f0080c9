//! Article model
//!
//! This module provides:
//! - `Article` entity, the one persisted document
//! - `ArticleDraft` and `ArticlePatch` input types for create and update
//! - `FilterMode` for the derived news views
//!
//! Field names serialize in camelCase, the shape stored in the key-value
//! backend and returned over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::services::date::parse_date;

/// Default category for new articles
pub const DEFAULT_CATEGORY: &str = "news";

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Opaque identifier, assigned once by the store
    pub id: String,
    /// URL-friendly slug derived from the title
    pub slug: String,
    pub title: String,
    /// Body; may contain markup and is never interpreted here
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    /// Logical publish date, `YYYY-MM-DD`
    pub date: String,
    /// Human-readable rendering of `date`
    #[serde(default)]
    pub date_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Image URLs in display order
    #[serde(default)]
    pub images: Vec<String>,
    /// Embeddable video URLs
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Absent until the first update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_published() -> bool {
    true
}

impl Article {
    /// Number of attached media items
    pub fn media_count(&self) -> usize {
        self.images.len() + self.videos.len()
    }

    /// Case-insensitive substring match over title, excerpt, content and tags
    ///
    /// `needle` must already be lowercase.
    pub fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.excerpt.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }

    /// Merge the provided patch fields over this article
    ///
    /// Only content fields are touched; `slug`, `dateDisplay` and `updatedAt`
    /// are the store's responsibility.
    pub fn apply_patch(&mut self, patch: &ArticlePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(excerpt) = &patch.excerpt {
            self.excerpt = excerpt.clone();
        }
        if let Some(date) = &patch.date {
            self.date = date.clone();
        }
        if let Some(cover_image) = &patch.cover_image {
            self.cover_image = cover_image.clone();
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
        if let Some(videos) = &patch.videos {
            self.videos = videos.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
    }
}

/// Sort newest `date` first
///
/// The sort is stable, so equal dates keep their incoming order. Dates that
/// do not parse sort last.
pub fn sort_by_date_desc(articles: &mut [Article]) {
    articles.sort_by(|a, b| parse_date(&b.date).cmp(&parse_date(&a.date)));
}

/// Input for creating an article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; today when omitted
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub videos: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl ArticleDraft {
    /// Draft with just the required fields
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Partial update: provided fields replace, omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// `Some(None)` clears the cover image
    #[serde(default, deserialize_with = "present_or_null")]
    pub cover_image: Option<Option<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub videos: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub featured: Option<bool>,
}

/// Distinguish an explicit `null` from an omitted field
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Derived view over the cached collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Unmodified order
    #[default]
    All,
    /// Top 5 by date
    Recent,
    /// By attached media count
    Popular,
}
