//! Redis key-value backend
//!
//! For deployments that already run Redis instead of a hosted KV.
//!
//! # Features
//! - Values stored as JSON text with plain GET/SET/DEL
//! - Key listing via SCAN (production-safe, not KEYS)
//! - Thread-safe async access over one multiplexed connection

use super::KvBackend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde_json::Value;

/// Number of keys to scan per iteration in `keys`
const SCAN_COUNT: usize = 100;

/// Redis-backed key-value store
pub struct RedisKv {
    connection: MultiplexedConnection,
}

impl std::fmt::Debug for RedisKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKv").finish_non_exhaustive()
    }
}

impl RedisKv {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .context("Failed to get value from Redis")?;

        match result {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .context("Failed to deserialize stored value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut conn = self.connection.clone();

        let json = serde_json::to_string(value).context("Failed to serialize KV value")?;

        let _: () = conn
            .set(key, json)
            .await
            .context("Failed to set value in Redis")?;

        Ok(())
    }

    /// If the key doesn't exist, this is a no-op.
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(key)
            .await
            .context("Failed to delete key from Redis")?;

        Ok(())
    }

    /// Redis SCAN MATCH already speaks glob patterns, so the pattern is passed
    /// through unchanged.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut found = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            // SCAN returns (new_cursor, keys)
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan keys in Redis")?;

            found.extend(keys);
            cursor = new_cursor;

            // Cursor 0 means we've completed the full iteration
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        found.sort();
        found.dedup();
        Ok(found)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
