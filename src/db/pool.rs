//! SQLite connection pool
//!
//! Used by the relational article store. The database file and its parent
//! directory are created on first use.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;

/// Normalize a configured path or URL into a sqlx connection URL
fn connection_url(url: &str) -> String {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return "sqlite::memory:".to_string();
    }

    if url.starts_with("sqlite:") {
        // If it already has options, don't modify
        if url.contains('?') {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else {
        format!("sqlite:{}?mode=rwc", url)
    }
}

/// Create the parent directory of a file-based database
fn ensure_parent_dir(url: &str) -> Result<()> {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = url.trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Open a pool for the configured database
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_parent_dir(&config.url)?;

    let in_memory = config.url == ":memory:" || config.url.starts_with("sqlite::memory:");
    // Every pooled connection to `sqlite::memory:` would get its own database
    let max_connections = if in_memory { 1 } else { 10 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&connection_url(&config.url))
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", config.url))?;

    Ok(pool)
}

/// Create a SQLite in-memory pool for tests
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(&DatabaseConfig {
        url: ":memory:".to_string(),
    })
    .await
}
