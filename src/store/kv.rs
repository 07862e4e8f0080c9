//! Key-value article store
//!
//! Layout in the backend:
//! - `articles` - the article index, a JSON array of ids, newest inserted first
//! - `article:{id}` - one JSON article record per id
//!
//! The index alone decides which articles exist. Records with no index entry
//! are orphans and stay invisible; index entries with no record are skipped.
//!
//! Index read-modify-write cycles are serialized by a process-local lock.
//! `create` writes the index entry before the record and rolls the index back
//! if the record write fails.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    build_article, merge_patch, new_article_id, unique_slug, validate_draft, validate_patch,
    ArticleStore, ReconcileReport, StoreError,
};
use crate::config::DateLocale;
use crate::kv::{read_json, write_json, KvBackend};
use crate::models::{Article, ArticleDraft, ArticlePatch};

/// Key holding the article index
pub const INDEX_KEY: &str = "articles";

/// Prefix of per-article record keys
pub const RECORD_PREFIX: &str = "article:";

fn record_key(id: &str) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

/// Article store over a key-value backend
pub struct KvArticleStore {
    kv: Arc<dyn KvBackend>,
    locale: DateLocale,
    index_lock: Mutex<()>,
}

impl KvArticleStore {
    /// Create a new store
    pub fn new(kv: Arc<dyn KvBackend>, locale: DateLocale) -> Self {
        Self {
            kv,
            locale,
            index_lock: Mutex::new(()),
        }
    }

    /// Create a boxed store for use with dependency injection
    pub fn boxed(kv: Arc<dyn KvBackend>, locale: DateLocale) -> Arc<dyn ArticleStore> {
        Arc::new(Self::new(kv, locale))
    }

    /// Read the index; a missing key is an empty index
    async fn read_index(&self) -> Result<Vec<String>, StoreError> {
        let ids: Option<Vec<String>> = read_json(self.kv.as_ref(), INDEX_KEY).await?;
        Ok(ids.unwrap_or_default())
    }

    async fn write_index(&self, ids: &[String]) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), INDEX_KEY, ids).await?;
        Ok(())
    }

    /// Fetch records for `ids` concurrently, keeping index order
    ///
    /// Missing or unreadable records are skipped; duplicate ids are read once.
    async fn load_records(&self, ids: &[String]) -> Vec<Article> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let reads = unique.iter().map(|id| async move {
            let key = record_key(id);
            (id, read_json::<Article>(self.kv.as_ref(), &key).await)
        });

        join_all(reads)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(Some(article)) => Some(article),
                Ok(None) => {
                    tracing::debug!("Skipping dangling article id {}", id);
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable article record {}: {:#}", id, e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl ArticleStore for KvArticleStore {
    async fn try_list_indexed(&self) -> Result<Vec<Article>, StoreError> {
        let ids = self.read_index().await?;
        Ok(self.load_records(&ids).await)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>, StoreError> {
        if id.is_empty() {
            return Ok(None);
        }
        Ok(read_json(self.kv.as_ref(), &record_key(id)).await?)
    }

    async fn create(&self, draft: ArticleDraft) -> Result<Article, StoreError> {
        validate_draft(&draft)?;

        let _guard = self.index_lock.lock().await;

        let index = self.read_index().await?;
        let existing = self.load_records(&index).await;

        let id = new_article_id();
        let slug = unique_slug(&draft.title, &id, &existing);
        let article = build_article(id.clone(), slug, draft, self.locale)?;

        let mut updated_index = Vec::with_capacity(index.len() + 1);
        updated_index.push(id.clone());
        updated_index.extend(index.iter().filter(|i| **i != id).cloned());

        self.write_index(&updated_index).await?;

        if let Err(e) = write_json(self.kv.as_ref(), &record_key(&id), &article).await {
            tracing::error!("Failed to write article record {}: {:#}", id, e);
            if let Err(rollback) = self.write_index(&index).await {
                tracing::error!(
                    "Index rollback for {} failed, leaving a dangling id: {}",
                    id,
                    rollback
                );
            }
            return Err(StoreError::Backend(e));
        }

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

        write_json(self.kv.as_ref(), &record_key(id), &article)
            .await
            .map_err(|e| {
                tracing::error!("Failed to write article record {}: {:#}", id, e);
                StoreError::Backend(e)
            })?;

        tracing::debug!("Updated article {}", id);
        Ok(Some(article))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().await;

        self.kv.delete(&record_key(id)).await.map_err(|e| {
            tracing::error!("Failed to delete article record {}: {:#}", id, e);
            StoreError::Backend(e)
        })?;

        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|i| i != id);
        if index.len() != before {
            self.write_index(&index).await?;
        }

        tracing::debug!("Deleted article {}", id);
        Ok(())
    }

    async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        let _guard = self.index_lock.lock().await;

        let index = self.read_index().await?;
        let indexed: HashSet<&str> = index.iter().map(String::as_str).collect();

        let pattern = format!("{}*", RECORD_PREFIX);
        let mut orphaned: Vec<String> = self
            .kv
            .keys(&pattern)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(RECORD_PREFIX).map(str::to_string))
            .filter(|id| !indexed.contains(id.as_str()))
            .collect();
        orphaned.sort();

        let checks = index.iter().map(|id| async move {
            let exists = self.kv.get(&record_key(id)).await?.is_some();
            Ok::<_, anyhow::Error>((id.clone(), exists))
        });
        let mut dangling = Vec::new();
        for check in join_all(checks).await {
            let (id, exists) = check?;
            if !exists {
                dangling.push(id);
            }
        }

        if !dangling.is_empty() {
            let pruned: Vec<String> = index
                .iter()
                .filter(|id| !dangling.contains(id))
                .cloned()
                .collect();
            self.write_index(&pruned).await?;
        }

        tracing::info!(
            "Reconciled article index: {} orphaned, {} dangling pruned",
            orphaned.len(),
            dangling.len()
        );
        Ok(ReconcileReport { orphaned, dangling })
    }

    fn name(&self) -> &'static str {
        "kv"
    }
}
