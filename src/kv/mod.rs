//! Key-value backend
//!
//! The article store keeps its data in a string-keyed store of JSON values.
//! Three backends are provided:
//! - In-process store (moka) - default, for development and single-instance use
//! - Hosted KV over its REST API (Upstash / Vercel KV dialect)
//! - Redis - optional, behind the `redis-kv` feature
//!
//! The backend is selected based on configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! use newsroom::kv::{create_kv, read_json};
//! use newsroom::config::KvConfig;
//!
//! let kv = create_kv(&KvConfig::default()).await?;
//! kv.set("greeting", &serde_json::json!("hello")).await?;
//! let value: Option<String> = read_json(kv.as_ref(), "greeting").await?;
//! ```

pub mod memory;
#[cfg(feature = "redis-kv")]
pub mod redis;
pub mod rest;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{KvConfig, KvDriver};

pub use memory::MemoryKv;
#[cfg(feature = "redis-kv")]
pub use redis::RedisKv;
pub use rest::RestKv;

/// Key-value backend contract
///
/// Values are JSON documents. Absent keys read as `None`; deleting an absent
/// key is a no-op. Implementations are shared behind `Arc<dyn KvBackend>`.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys matching a glob pattern (`*`, `?`)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Short backend name used in logs and health output
    fn name(&self) -> &'static str;
}

/// Read a value and decode it into `T`
pub async fn read_json<T: DeserializeOwned>(kv: &dyn KvBackend, key: &str) -> Result<Option<T>> {
    match kv.get(key).await? {
        Some(value) => {
            let decoded = serde_json::from_value(value)
                .with_context(|| format!("Failed to decode value stored at '{}'", key))?;
            Ok(Some(decoded))
        }
        None => Ok(None),
    }
}

/// Encode `value` as JSON and write it
pub async fn write_json<T: Serialize + ?Sized>(kv: &dyn KvBackend, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)
        .with_context(|| format!("Failed to encode value for '{}'", key))?;
    kv.set(key, &value).await
}

/// Check if a glob pattern matches a key
///
/// Supports:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
///
/// # Examples
/// - `article:*` matches `article:123`, `article:abc`
/// - `user:?:profile` matches `user:1:profile`, `user:a:profile`
pub(crate) fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let key_chars: Vec<char> = key.chars().collect();
    glob_match(&pattern_chars, &key_chars, 0, 0)
}

fn glob_match(pattern: &[char], key: &[char], pi: usize, ki: usize) -> bool {
    if pi == pattern.len() {
        return ki == key.len();
    }

    match pattern[pi] {
        '*' => {
            // zero characters, then one or more
            glob_match(pattern, key, pi + 1, ki)
                || (ki < key.len() && glob_match(pattern, key, pi, ki + 1))
        }
        '?' => ki < key.len() && glob_match(pattern, key, pi + 1, ki + 1),
        literal => ki < key.len() && key[ki] == literal && glob_match(pattern, key, pi + 1, ki + 1),
    }
}

/// Create a key-value backend based on configuration
///
/// - `KvDriver::Memory` - in-process store using moka
/// - `KvDriver::Rest` - hosted KV REST API (requires `rest_url` and `rest_token`)
/// - `KvDriver::Redis` - Redis (requires the `redis-kv` feature and `redis_url`)
///
/// # Errors
/// - Returns an error if a required URL or token is missing
/// - Returns an error if Redis is configured but the `redis-kv` feature is not enabled
/// - Returns an error if the Redis connection fails
pub async fn create_kv(config: &KvConfig) -> Result<Arc<dyn KvBackend>> {
    match config.driver {
        KvDriver::Memory => Ok(Arc::new(MemoryKv::new())),
        KvDriver::Rest => {
            let url = config.rest_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "KV REST URL is required when using the rest driver. \
                     Set 'kv.rest_url' or the KV_REST_API_URL environment variable."
                )
            })?;
            let token = config.rest_token.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "KV REST token is required when using the rest driver. \
                     Set 'kv.rest_token' or the KV_REST_API_TOKEN environment variable."
                )
            })?;
            let kv = RestKv::new(url, token, Duration::from_secs(config.timeout_seconds))?;
            Ok(Arc::new(kv))
        }
        KvDriver::Redis => {
            #[cfg(feature = "redis-kv")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the redis driver. \
                         Set 'kv.redis_url' or the NEWSROOM_KV_REDIS_URL environment variable."
                    )
                })?;
                let kv = RedisKv::new(redis_url).await?;
                Ok(Arc::new(kv))
            }

            #[cfg(not(feature = "redis-kv"))]
            {
                anyhow::bail!(
                    "Redis driver is configured but the 'redis-kv' feature is not enabled. \
                     Either enable the feature with `--features redis-kv` or use another kv driver."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_memory_kv() {
        let kv = create_kv(&KvConfig::default()).await.unwrap();
        assert_eq!(kv.name(), "memory");

        kv.set("test_key", &json!("test_value")).await.unwrap();
        assert_eq!(kv.get("test_key").await.unwrap(), Some(json!("test_value")));
    }

    #[tokio::test]
    async fn test_create_rest_kv_without_url() {
        let config = KvConfig {
            driver: KvDriver::Rest,
            rest_token: Some("token".to_string()),
            ..KvConfig::default()
        };

        let err = create_kv(&config).await.err().unwrap().to_string();
        assert!(err.contains("KV REST URL"));
    }

    #[tokio::test]
    async fn test_create_rest_kv_without_token() {
        let config = KvConfig {
            driver: KvDriver::Rest,
            rest_url: Some("http://127.0.0.1:1".to_string()),
            ..KvConfig::default()
        };

        let err = create_kv(&config).await.err().unwrap().to_string();
        assert!(err.contains("token"));
    }

    #[tokio::test]
    async fn test_create_rest_kv() {
        let config = KvConfig {
            driver: KvDriver::Rest,
            rest_url: Some("http://127.0.0.1:1".to_string()),
            rest_token: Some("token".to_string()),
            ..KvConfig::default()
        };

        let kv = create_kv(&config).await.unwrap();
        assert_eq!(kv.name(), "rest");
    }

    #[cfg(not(feature = "redis-kv"))]
    #[tokio::test]
    async fn test_create_redis_kv_without_feature() {
        let config = KvConfig {
            driver: KvDriver::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
            ..KvConfig::default()
        };

        let err = create_kv(&config).await.err().unwrap().to_string();
        assert!(err.contains("redis-kv") && err.contains("feature"));
    }

    #[cfg(feature = "redis-kv")]
    #[tokio::test]
    async fn test_create_redis_kv_without_url() {
        let config = KvConfig {
            driver: KvDriver::Redis,
            ..KvConfig::default()
        };

        let err = create_kv(&config).await.err().unwrap().to_string();
        assert!(err.contains("Redis URL"));
    }

    #[tokio::test]
    async fn test_read_write_json() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Entry {
            id: String,
            views: u32,
        }

        let kv = MemoryKv::new();
        let entry = Entry {
            id: "abc".to_string(),
            views: 3,
        };

        write_json(&kv, "entry:abc", &entry).await.unwrap();
        let read: Option<Entry> = read_json(&kv, "entry:abc").await.unwrap();
        assert_eq!(read, Some(entry));

        let missing: Option<Entry> = read_json(&kv, "entry:zzz").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_read_json_type_mismatch_is_error() {
        let kv = MemoryKv::new();
        kv.set("articles", &json!({"not": "a list"})).await.unwrap();

        let result: Result<Option<Vec<String>>> = read_json(&kv, "articles").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_matches() {
        // Star wildcard
        assert!(pattern_matches("article:*", "article:123"));
        assert!(pattern_matches("article:*", "article:"));
        assert!(pattern_matches("*:123", "article:123"));
        assert!(pattern_matches("*", "anything"));
        assert!(!pattern_matches("article:*", "articles"));

        // Question mark wildcard
        assert!(pattern_matches("user:?:profile", "user:1:profile"));
        assert!(!pattern_matches("user:?:profile", "user:10:profile"));

        // Non-ASCII keys match per character
        assert!(pattern_matches("статия:?", "статия:я"));

        // Exact match
        assert!(pattern_matches("exact", "exact"));
        assert!(!pattern_matches("exact", "exactx"));
        assert!(!pattern_matches("exactx", "exact"));
    }
}
