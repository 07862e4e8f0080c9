//! Article table
//!
//! The relational store has a single table whose columns map 1:1 onto the
//! `Article` fields. `seq` records insertion order; list, media and tag
//! columns hold JSON text.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        slug TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        date_display TEXT NOT NULL DEFAULT '',
        cover_image TEXT,
        images TEXT NOT NULL DEFAULT '[]',
        videos TEXT NOT NULL DEFAULT '[]',
        category TEXT NOT NULL DEFAULT 'news',
        tags TEXT NOT NULL DEFAULT '[]',
        featured INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP,
        published INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_slug ON articles(slug)",
];

/// Create the article table if it does not exist
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create article schema")?;
    }
    tracing::debug!("Article schema ready");
    Ok(())
}
