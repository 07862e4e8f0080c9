//! Article state cache
//!
//! In-memory copy of the article collection for read-heavy surfaces. It loads
//! everything once with `refresh()`, then mirrors each mutation made through
//! it so lists never flicker empty during an edit. Derived views (`search`,
//! `filter`) are computed from memory without touching the backend.
//!
//! Store errors are recorded in the state's `error` field and also returned
//! to the caller. Mutations on the same article id are serialized; changes
//! made by other writers only show up after the next `refresh()`.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{sort_by_date_desc, Article, ArticleDraft, ArticlePatch, FilterMode};
use crate::store::{ArticleStore, StoreError};

/// Number of articles in the `recent` view
pub const RECENT_LIMIT: usize = 5;

/// Observable cache state
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleState {
    pub articles: Vec<Article>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Article state cache over an article store
pub struct ArticleCache {
    store: Arc<dyn ArticleStore>,
    state: RwLock<ArticleState>,
    id_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArticleCache {
    /// Create an empty cache; call `refresh()` to load
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self {
            store,
            state: RwLock::new(ArticleState::default()),
            id_locks: Mutex::new(HashMap::new()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ArticleState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ArticleState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn id_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.id_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id.to_string()).or_default().clone()
    }

    /// Drop the id's lock entry once `lock` is the last handle outside the map
    fn release_id_lock(&self, id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.id_locks.lock().unwrap_or_else(|e| e.into_inner());
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
    }

    fn record_error(&self, message: String) {
        tracing::warn!("Article cache: {}", message);
        self.write_state().error = Some(message);
    }

    /// Reload the whole collection
    ///
    /// On failure the previous articles stay in place and `error` is set.
    pub async fn refresh(&self) -> ArticleState {
        self.write_state().loading = true;

        let result = self.store.try_list_all().await;

        let mut state = self.write_state();
        match result {
            Ok(mut articles) => {
                sort_by_date_desc(&mut articles);
                tracing::debug!("Article cache refreshed with {} articles", articles.len());
                state.articles = articles;
                state.error = None;
            }
            Err(e) => {
                tracing::warn!("Article cache refresh failed: {}", e);
                state.error = Some(format!("Failed to load articles: {}", e));
            }
        }
        state.loading = false;
        state.clone()
    }

    /// Create through the store and prepend the result
    pub async fn create(&self, draft: ArticleDraft) -> Result<Article, StoreError> {
        match self.store.create(draft).await {
            Ok(article) => {
                let mut state = self.write_state();
                state.articles.insert(0, article.clone());
                state.error = None;
                Ok(article)
            }
            Err(e) => {
                self.record_error(format!("Failed to create article: {}", e));
                Err(e)
            }
        }
    }

    /// Update through the store and replace the cached copy in place
    pub async fn update(
        &self,
        id: &str,
        patch: ArticlePatch,
    ) -> Result<Option<Article>, StoreError> {
        let lock = self.id_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.store.update(id, patch).await
        };
        self.release_id_lock(id, lock);

        match result {
            Ok(Some(article)) => {
                let mut state = self.write_state();
                if let Some(slot) = state.articles.iter_mut().find(|a| a.id == article.id) {
                    *slot = article.clone();
                }
                state.error = None;
                Ok(Some(article))
            }
            Ok(None) => {
                self.record_error(format!("Article not found: {}", id));
                Ok(None)
            }
            Err(e) => {
                self.record_error(format!("Failed to update article: {}", e));
                Err(e)
            }
        }
    }

    /// Delete through the store and drop the cached copy
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let lock = self.id_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.store.delete(id).await
        };
        self.release_id_lock(id, lock);

        match result {
            Ok(()) => {
                let mut state = self.write_state();
                state.articles.retain(|a| a.id != id);
                state.error = None;
                Ok(())
            }
            Err(e) => {
                self.record_error(format!("Failed to delete article: {}", e));
                Err(e)
            }
        }
    }

    /// Cached articles matching `query`; a blank query returns everything
    pub fn search(&self, query: &str) -> Vec<Article> {
        let state = self.read_state();
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return state.articles.clone();
        }
        state
            .articles
            .iter()
            .filter(|a| a.matches_query(&needle))
            .cloned()
            .collect()
    }

    /// Derived view of the cached articles
    pub fn filter(&self, mode: FilterMode) -> Vec<Article> {
        apply_filter(self.articles(), mode)
    }

    /// Search, then filter
    pub fn view(&self, query: Option<&str>, mode: FilterMode) -> Vec<Article> {
        apply_filter(self.search(query.unwrap_or("")), mode)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ArticleState {
        self.read_state().clone()
    }

    /// Copy of the cached articles
    pub fn articles(&self) -> Vec<Article> {
        self.read_state().articles.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }
}

fn apply_filter(mut articles: Vec<Article>, mode: FilterMode) -> Vec<Article> {
    match mode {
        FilterMode::All => {}
        FilterMode::Recent => {
            sort_by_date_desc(&mut articles);
            articles.truncate(RECENT_LIMIT);
        }
        FilterMode::Popular => {
            articles.sort_by(|a, b| b.media_count().cmp(&a.media_count()));
        }
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateLocale;
    use crate::kv::testing::{FlakyKv, KvOp};
    use crate::store::kv::INDEX_KEY;
    use crate::store::KvArticleStore;

    fn setup() -> (Arc<FlakyKv>, Arc<dyn ArticleStore>, ArticleCache) {
        let kv = Arc::new(FlakyKv::new());
        let store = KvArticleStore::boxed(kv.clone(), DateLocale::Bg);
        let cache = ArticleCache::new(store.clone());
        (kv, store, cache)
    }

    fn draft(title: &str, date: &str) -> ArticleDraft {
        ArticleDraft {
            date: Some(date.to_string()),
            ..ArticleDraft::new(title, format!("{} body", title))
        }
    }

    fn ids(articles: &[Article]) -> Vec<String> {
        articles.iter().map(|a| a.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_refresh_loads_sorted_collection() {
        let (_, store, cache) = setup();
        let old = store.create(draft("Old", "2023-01-01")).await.unwrap();
        let new = store.create(draft("New", "2024-01-01")).await.unwrap();

        let state = cache.refresh().await;

        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(ids(&state.articles), vec![new.id, old.id]);
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_articles() {
        let (kv, store, cache) = setup();
        let a = store.create(draft("A", "2024-01-01")).await.unwrap();
        cache.refresh().await;

        kv.fail(KvOp::Get, INDEX_KEY);
        let state = cache.refresh().await;

        assert_eq!(ids(&state.articles), vec![a.id]);
        assert!(state.error.is_some());
        assert!(!state.loading);

        kv.heal();
        assert!(cache.refresh().await.error.is_none());
    }

    #[tokio::test]
    async fn test_create_prepends_without_refresh() {
        let (_, _, cache) = setup();
        let older_date = cache.create(draft("First", "2024-06-01")).await.unwrap();
        let newer_insert = cache.create(draft("Second", "2020-01-01")).await.unwrap();

        // insertion order, not date order
        assert_eq!(ids(&cache.articles()), vec![newer_insert.id, older_date.id]);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_state_and_records_error() {
        let (kv, _, cache) = setup();
        cache.create(draft("Kept", "2024-01-01")).await.unwrap();
        let before = cache.articles();

        let err = cache.create(ArticleDraft::new("", "body")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(cache.articles(), before);
        assert!(cache.error().unwrap().contains("Title is required"));

        kv.fail(KvOp::Set, INDEX_KEY);
        assert!(cache.create(draft("Lost", "2024-01-02")).await.is_err());
        assert_eq!(cache.articles(), before);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let (_, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();
        let b = cache.create(draft("B", "2024-01-02")).await.unwrap();
        let c = cache.create(draft("C", "2024-01-03")).await.unwrap();

        let updated = cache
            .update(
                &b.id,
                ArticlePatch {
                    title: Some("B2".to_string()),
                    date: Some("2030-01-01".to_string()),
                    ..ArticlePatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let articles = cache.articles();
        assert_eq!(ids(&articles), vec![c.id, b.id.clone(), a.id]);
        assert_eq!(articles[1], updated);
        assert_eq!(articles[1].title, "B2");
    }

    #[tokio::test]
    async fn test_update_not_found_records_error() {
        let (_, _, cache) = setup();
        cache.create(draft("A", "2024-01-01")).await.unwrap();
        let before = cache.articles();

        let result = cache.update("missing", ArticlePatch::default()).await.unwrap();

        assert!(result.is_none());
        assert_eq!(cache.articles(), before);
        assert!(cache.error().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_update_backend_failure_leaves_state() {
        let (kv, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();
        kv.fail(KvOp::Set, "article:*");

        let result = cache
            .update(
                &a.id,
                ArticlePatch {
                    featured: Some(true),
                    ..ArticlePatch::default()
                },
            )
            .await;

        assert!(result.is_err());
        assert!(!cache.articles()[0].featured);
        assert!(cache.error().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_and_is_idempotent() {
        let (_, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();
        let b = cache.create(draft("B", "2024-01-02")).await.unwrap();

        cache.delete(&a.id).await.unwrap();
        cache.delete(&a.id).await.unwrap();

        assert_eq!(ids(&cache.articles()), vec![b.id]);
        assert!(cache.error().is_none());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_article() {
        let (kv, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();
        kv.fail_all(KvOp::Delete);

        assert!(cache.delete(&a.id).await.is_err());
        assert_eq!(ids(&cache.articles()), vec![a.id]);
        assert!(cache.error().is_some());
    }

    #[tokio::test]
    async fn test_search_blank_returns_everything() {
        let (_, _, cache) = setup();
        cache.create(draft("Зелена енергия", "2024-01-01")).await.unwrap();
        cache.create(draft("Budget", "2024-01-02")).await.unwrap();
        let all = cache.articles();

        assert_eq!(cache.search(""), all);
        assert_eq!(cache.search("   "), all);
        assert_eq!(cache.search("зелена").len(), 1);
        assert_eq!(cache.search("BUDGET").len(), 1);
        assert!(cache.search("nothing").is_empty());
    }

    #[tokio::test]
    async fn test_search_reflects_unrefreshed_mutations() {
        let (_, _, cache) = setup();
        let a = cache.create(draft("Before", "2024-01-01")).await.unwrap();
        cache
            .update(
                &a.id,
                ArticlePatch {
                    title: Some("After".to_string()),
                    ..ArticlePatch::default()
                },
            )
            .await
            .unwrap();

        assert!(cache.search("before").iter().all(|x| x.title != "Before"));
        assert_eq!(cache.search("after").len(), 1);
    }

    #[tokio::test]
    async fn test_filter_modes() {
        let (_, _, cache) = setup();
        for day in 1..=7 {
            cache
                .create(ArticleDraft {
                    images: Some(vec!["/i.jpg".to_string(); day % 3]),
                    videos: Some(vec!["/v.mp4".to_string(); usize::from(day == 4)]),
                    ..draft(&format!("Day {}", day), &format!("2024-01-0{}", day))
                })
                .await
                .unwrap();
        }

        let all = cache.filter(FilterMode::All);
        assert_eq!(all, cache.articles());

        let recent = cache.filter(FilterMode::Recent);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].date, "2024-01-07");
        assert_eq!(recent[4].date, "2024-01-03");

        let popular = cache.filter(FilterMode::Popular);
        assert_eq!(popular.len(), 7);
        let counts: Vec<usize> = popular.iter().map(|a| a.media_count()).collect();
        let mut sorted = counts.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(counts, sorted);
        assert_eq!(popular[0].date, "2024-01-05");
    }

    #[tokio::test]
    async fn test_view_combines_search_and_filter() {
        let (_, _, cache) = setup();
        for day in 1..=7 {
            cache
                .create(draft(&format!("Policy {}", day), &format!("2024-02-0{}", day)))
                .await
                .unwrap();
        }
        cache.create(draft("Unrelated", "2024-03-01")).await.unwrap();

        let view = cache.view(Some("policy"), FilterMode::Recent);
        assert_eq!(view.len(), 5);
        assert!(view.iter().all(|a| a.title.starts_with("Policy")));
        assert_eq!(view[0].date, "2024-02-07");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_to_one_article_are_serialized() {
        let (_, store, cache) = setup();
        let cache = Arc::new(cache);
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..10 {
            let cache = cache.clone();
            let id = a.id.clone();
            tasks.push(tokio::spawn(async move {
                let patch = if i % 2 == 0 {
                    ArticlePatch {
                        tags: Some(vec![format!("tag-{}", i)]),
                        ..ArticlePatch::default()
                    }
                } else {
                    ArticlePatch {
                        featured: Some(true),
                        ..ArticlePatch::default()
                    }
                };
                cache.update(&id, patch).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = store.get_by_id(&a.id).await.unwrap().unwrap();
        assert!(stored.featured);
        assert_eq!(stored.tags.len(), 1);
        assert_eq!(cache.articles()[0], stored);
    }

    fn lock_count(cache: &ArticleCache) -> usize {
        cache.id_locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_id_locks_are_released_after_mutations() {
        let (_, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();

        cache
            .update(&a.id, ArticlePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert!(cache.update("missing", ArticlePatch::default()).await.unwrap().is_none());
        cache.delete("never-existed").await.unwrap();
        cache.delete(&a.id).await.unwrap();

        assert_eq!(lock_count(&cache), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_lock_while_another_task_holds_it() {
        let (_, _, cache) = setup();
        let a = cache.create(draft("A", "2024-01-01")).await.unwrap();

        let waiter = cache.id_lock(&a.id);
        cache.delete(&a.id).await.unwrap();

        // a later mutation still queues behind the same mutex
        assert_eq!(lock_count(&cache), 1);
        assert!(Arc::ptr_eq(&waiter, &cache.id_lock(&a.id)));

        drop(waiter);
        cache.update(&a.id, ArticlePatch::default()).await.unwrap();
        assert_eq!(lock_count(&cache), 0);
    }
}
