//! Media storage
//!
//! Validates uploaded images and videos against the configured type and size
//! limits and stores them under `{upload.path}/images|videos/{uuid}.{ext}`.
//! Articles only ever receive the returned public URL.

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;

/// Kind of uploaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Subdirectory (and URL segment) for this kind
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

/// Stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Error types for media uploads
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid file type: {content_type}. Allowed types: {allowed}")]
    UnsupportedType {
        content_type: String,
        allowed: String,
    },

    #[error("File too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("File is empty")]
    Empty,

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Validated file storage for article media
pub struct MediaStore {
    config: UploadConfig,
}

impl MediaStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Directory files are written to
    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// URL prefix files are served under
    pub fn public_base_url(&self) -> &str {
        &self.config.public_base_url
    }

    /// Largest accepted upload of any kind
    pub fn max_upload_size(&self) -> u64 {
        self.config.max_image_size.max(self.config.max_video_size)
    }

    fn limits(&self, kind: MediaKind) -> (&[String], u64) {
        match kind {
            MediaKind::Image => (&self.config.image_types, self.config.max_image_size),
            MediaKind::Video => (&self.config.video_types, self.config.max_video_size),
        }
    }

    /// Check type and size without storing anything
    ///
    /// Returns the normalized content type.
    pub fn validate(
        &self,
        kind: MediaKind,
        content_type: &str,
        size: u64,
    ) -> Result<String, MediaError> {
        let (allowed, max) = self.limits(kind);
        let content_type = normalize_content_type(content_type);

        if !allowed.iter().any(|t| t.eq_ignore_ascii_case(&content_type)) {
            return Err(MediaError::UnsupportedType {
                content_type,
                allowed: allowed.join(", "),
            });
        }
        if size == 0 {
            return Err(MediaError::Empty);
        }
        if size > max {
            return Err(MediaError::TooLarge { size, max });
        }
        Ok(content_type)
    }

    /// Validate and store a file, returning its public URL
    pub async fn save(
        &self,
        kind: MediaKind,
        original_name: Option<&str>,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredMedia, MediaError> {
        let content_type = self.validate(kind, content_type, data.len() as u64)?;

        let dir = self.config.path.join(kind.dir());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload dir {}", dir.display()))?;

        let ext = get_extension(original_name, &content_type);
        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let file_path: PathBuf = dir.join(&filename);

        fs::write(&file_path, data)
            .await
            .with_context(|| format!("Failed to save file {}", file_path.display()))?;

        let url = format!(
            "{}/{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            kind.dir(),
            filename
        );
        tracing::info!("Stored {} bytes at {}", data.len(), url);

        Ok(StoredMedia {
            url,
            filename,
            size: data.len() as u64,
            content_type,
        })
    }
}

/// Lowercase MIME type without parameters
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// File extension from the content type, falling back to the original name
fn get_extension(original_name: Option<&str>, content_type: &str) -> String {
    let known = match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/ogg" => Some("ogv"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> MediaStore {
        MediaStore::new(UploadConfig {
            path: dir.to_path_buf(),
            max_image_size: 16,
            ..UploadConfig::default()
        })
    }

    #[test]
    fn test_validate_types() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        assert_eq!(
            media.validate(MediaKind::Image, "image/PNG", 4).unwrap(),
            "image/png"
        );
        assert_eq!(
            media
                .validate(MediaKind::Image, "image/jpeg; charset=binary", 4)
                .unwrap(),
            "image/jpeg"
        );
        assert!(media.validate(MediaKind::Video, "video/webm", 4).is_ok());
        assert!(matches!(
            media.validate(MediaKind::Image, "video/mp4", 4),
            Err(MediaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            media.validate(MediaKind::Video, "image/gif", 4),
            Err(MediaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            media.validate(MediaKind::Image, "image/svg+xml", 4),
            Err(MediaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_validate_size() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        assert!(media.validate(MediaKind::Image, "image/gif", 16).is_ok());
        assert!(matches!(
            media.validate(MediaKind::Image, "image/gif", 17),
            Err(MediaError::TooLarge { size: 17, max: 16 })
        ));
        assert!(matches!(
            media.validate(MediaKind::Image, "image/gif", 0),
            Err(MediaError::Empty)
        ));
        // video limit is independent of the image limit
        assert!(media.validate(MediaKind::Video, "video/mp4", 1024).is_ok());
    }

    #[test]
    fn test_default_limits() {
        let config = UploadConfig::default();
        assert_eq!(config.max_image_size, 5 * 1024 * 1024);
        assert_eq!(config.max_video_size, 100 * 1024 * 1024);
        assert_eq!(MediaStore::new(config).max_upload_size(), 100 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_save_image() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        let stored = media
            .save(MediaKind::Image, Some("photo.JPEG"), "image/jpeg", b"jpegdata")
            .await
            .unwrap();

        assert!(stored.filename.ends_with(".jpg"));
        assert_eq!(stored.url, format!("/uploads/images/{}", stored.filename));
        assert_eq!(stored.size, 8);
        assert_eq!(stored.content_type, "image/jpeg");

        let on_disk = std::fs::read(dir.path().join("images").join(&stored.filename)).unwrap();
        assert_eq!(on_disk, b"jpegdata");
    }

    #[tokio::test]
    async fn test_save_video_uses_public_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            public_base_url: "https://cdn.example.org/media/".to_string(),
            ..UploadConfig::default()
        });

        let stored = media
            .save(MediaKind::Video, None, "video/ogg", b"ogg")
            .await
            .unwrap();

        assert!(stored
            .url
            .starts_with("https://cdn.example.org/media/videos/"));
        assert!(stored.filename.ends_with(".ogv"));
        assert!(dir.path().join("videos").join(&stored.filename).exists());
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        let result = media
            .save(MediaKind::Image, Some("big.png"), "image/png", &[0u8; 32])
            .await;

        assert!(matches!(result, Err(MediaError::TooLarge { .. })));
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn test_get_extension_fallback() {
        assert_eq!(get_extension(Some("a.PNG"), "image/png"), "png");
        assert_eq!(get_extension(Some("clip.MOV"), "video/quicktime"), "mov");
        assert_eq!(get_extension(Some("noext"), "application/x"), "bin");
        assert_eq!(get_extension(Some("bad.ex/t"), "application/x"), "bin");
        assert_eq!(get_extension(None, "application/x"), "bin");
    }
}
