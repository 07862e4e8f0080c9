//! Database layer
//!
//! SQLite backs the relational variant of the article store.
//!
//! # Usage
//!
//! ```ignore
//! use newsroom::config::DatabaseConfig;
//! use newsroom::db::{create_pool, ensure_schema};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! ensure_schema(&pool).await?;
//! ```

pub mod pool;
pub mod schema;

pub use pool::{create_pool, create_test_pool};
pub use schema::ensure_schema;
