//! Services layer
//!
//! - `article_cache` - in-memory article state with derived views
//! - `auth` - admin login and session tokens
//! - `media` - upload validation and storage
//! - `slug`, `date` - pure helpers shared by the stores

pub mod article_cache;
pub mod auth;
pub mod date;
pub mod media;
pub mod slug;

pub use article_cache::{ArticleCache, ArticleState};
pub use auth::{AdminAuth, AuthError};
pub use media::{MediaError, MediaKind, MediaStore, StoredMedia};
pub use slug::generate_slug;
