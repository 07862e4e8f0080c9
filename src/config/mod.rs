//! Configuration management
//!
//! This module handles loading and parsing configuration for the newsroom service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Article store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Key-value backend configuration
    #[serde(default)]
    pub kv: KvConfig,
    /// Relational database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Admin credentials
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin, `*` allows any
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

/// Article store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which store implementation backs the articles
    #[serde(default)]
    pub driver: StoreDriver,
    /// Create a welcome article when the store is empty at start-up
    #[serde(default)]
    pub seed_default_article: bool,
    /// Locale used to render `dateDisplay`
    #[serde(default)]
    pub date_locale: DateLocale,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::default(),
            seed_default_article: false,
            date_locale: DateLocale::default(),
        }
    }
}

/// Article store driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    /// Article index + records in the key-value backend (default)
    #[default]
    Kv,
    /// One row per article in SQLite
    Sqlite,
}

/// Locale for human-readable dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateLocale {
    /// Bulgarian, e.g. `Януари 2024 г.`
    #[default]
    Bg,
    /// English, e.g. `January 15, 2024`
    En,
}

/// Key-value backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// Backend driver (memory, rest or redis)
    #[serde(default)]
    pub driver: KvDriver,
    /// Base URL of the KV REST API
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Bearer token for the KV REST API
    #[serde(default)]
    pub rest_token: Option<String>,
    /// Redis connection URL
    #[serde(default)]
    pub redis_url: Option<String>,
    /// HTTP client timeout for the REST backend
    #[serde(default = "default_kv_timeout")]
    pub timeout_seconds: u64,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            driver: KvDriver::default(),
            rest_url: None,
            rest_token: None,
            redis_url: None,
            timeout_seconds: default_kv_timeout(),
        }
    }
}

fn default_kv_timeout() -> u64 {
    10
}

/// Key-value backend driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KvDriver {
    /// In-process store (default)
    #[default]
    Memory,
    /// Hosted KV over its REST API
    Rest,
    /// Redis
    Redis,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/newsroom.db".to_string()
}

/// Admin credentials. Login is refused until all three are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub admin_keyword: Option<String>,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// URL prefix under which uploaded files are served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Allowed image MIME types
    #[serde(default = "default_image_types")]
    pub image_types: Vec<String>,
    /// Maximum image size in bytes (default: 5MB)
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    /// Allowed video MIME types
    #[serde(default = "default_video_types")]
    pub video_types: Vec<String>,
    /// Maximum video size in bytes (default: 100MB)
    #[serde(default = "default_max_video_size")]
    pub max_video_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            public_base_url: default_public_base_url(),
            image_types: default_image_types(),
            max_image_size: default_max_image_size(),
            video_types: default_video_types(),
            max_video_size: default_max_video_size(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_base_url() -> String {
    "/uploads".to_string()
}

fn default_image_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
        "image/gif".to_string(),
    ]
}

fn default_max_image_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_video_types() -> Vec<String> {
    vec![
        "video/mp4".to_string(),
        "video/webm".to_string(),
        "video/ogg".to_string(),
    ]
}

fn default_max_video_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `NEWSROOM_<SECTION>_<KEY>`,
    /// e.g. `NEWSROOM_SERVER_PORT` or `NEWSROOM_KV_REST_URL`. The hosted KV
    /// names `KV_REST_API_URL` / `KV_REST_API_TOKEN` are used as fallbacks.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("NEWSROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NEWSROOM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("NEWSROOM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Store configuration
        if let Ok(driver) = std::env::var("NEWSROOM_STORE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "kv" => self.store.driver = StoreDriver::Kv,
                "sqlite" => self.store.driver = StoreDriver::Sqlite,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(locale) = std::env::var("NEWSROOM_STORE_DATE_LOCALE") {
            match locale.to_lowercase().as_str() {
                "bg" => self.store.date_locale = DateLocale::Bg,
                "en" => self.store.date_locale = DateLocale::En,
                _ => {}
            }
        }

        // KV configuration
        if let Ok(driver) = std::env::var("NEWSROOM_KV_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.kv.driver = KvDriver::Memory,
                "rest" => self.kv.driver = KvDriver::Rest,
                "redis" => self.kv.driver = KvDriver::Redis,
                _ => {}
            }
        }
        if let Some(url) = env_with_fallback("NEWSROOM_KV_REST_URL", "KV_REST_API_URL") {
            self.kv.rest_url = Some(url);
        }
        if let Some(token) = env_with_fallback("NEWSROOM_KV_REST_TOKEN", "KV_REST_API_TOKEN") {
            self.kv.rest_token = Some(token);
        }
        if let Ok(redis_url) = std::env::var("NEWSROOM_KV_REDIS_URL") {
            self.kv.redis_url = Some(redis_url);
        }

        // Database configuration
        if let Ok(url) = std::env::var("NEWSROOM_DATABASE_URL") {
            self.database.url = url;
        }

        // Admin credentials
        if let Ok(email) = std::env::var("NEWSROOM_ADMIN_EMAIL") {
            self.auth.admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("NEWSROOM_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
        if let Ok(keyword) = std::env::var("NEWSROOM_ADMIN_KEYWORD") {
            self.auth.admin_keyword = Some(keyword);
        }

        // Upload configuration
        if let Ok(path) = std::env::var("NEWSROOM_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
    }
}

fn env_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn store_driver_strategy() -> impl Strategy<Value = StoreDriver> {
        prop_oneof![Just(StoreDriver::Kv), Just(StoreDriver::Sqlite)]
    }

    fn kv_driver_strategy() -> impl Strategy<Value = KvDriver> {
        prop_oneof![
            Just(KvDriver::Memory),
            Just(KvDriver::Rest),
            Just(KvDriver::Redis),
        ]
    }

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            store_driver_strategy(),
            kv_driver_strategy(),
            proptest::option::of("https://[a-z]{3,10}\\.example"),
            1u64..=120,
            "[a-z][a-z0-9_/]{0,20}\\.db",
        )
            .prop_map(|(host, port, store_driver, kv_driver, rest_url, timeout, db)| {
                let mut config = Config::default();
                config.server.host = host;
                config.server.port = port;
                config.store.driver = store_driver;
                config.kv.driver = kv_driver;
                config.kv.rest_url = rest_url;
                config.kv.timeout_seconds = timeout;
                config.database.url = db;
                config
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Serializing a config to YAML and parsing it back preserves every field we set.
        #[test]
        fn config_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("serialize");
            let parsed: Config = serde_yaml::from_str(&yaml).expect("parse");

            prop_assert_eq!(parsed.server.host, config.server.host);
            prop_assert_eq!(parsed.server.port, config.server.port);
            prop_assert_eq!(parsed.store.driver, config.store.driver);
            prop_assert_eq!(parsed.kv.driver, config.kv.driver);
            prop_assert_eq!(parsed.kv.rest_url, config.kv.rest_url);
            prop_assert_eq!(parsed.kv.timeout_seconds, config.kv.timeout_seconds);
            prop_assert_eq!(parsed.database.url, config.database.url);
        }
    }
}
