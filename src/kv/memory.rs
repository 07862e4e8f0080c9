//! In-process key-value backend using moka
//!
//! Provides a thread-safe store for development, tests and single-instance
//! deployments where no hosted KV is available.
//!
//! # Features
//! - No capacity bound and no expiry: entries live until deleted
//! - Values stored as JSON text, the same shape the hosted backends keep
//! - Glob-style key listing

use super::{pattern_matches, KvBackend};
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;

/// Stored entry: serialized JSON text
#[derive(Clone)]
struct KvEntry {
    data: Arc<String>,
}

impl KvEntry {
    fn new(value: &Value) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize KV value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn decode(&self) -> Result<Value> {
        serde_json::from_str(&self.data).context("Failed to deserialize KV value")
    }
}

/// In-process key-value store
pub struct MemoryKv {
    entries: Cache<String, KvEntry>,
}

impl std::fmt::Debug for MemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKv")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl MemoryKv {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Current number of entries
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.entries.get(key).await {
            Some(entry) => Ok(Some(entry.decode()?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let entry = KvEntry::new(value)?;
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    /// If the key doesn't exist, this is a no-op.
    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        // moka's iter() yields (Arc<K>, V)
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key.as_ref()))
            .map(|(key, _)| (*key).clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
