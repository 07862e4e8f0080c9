//! Newsroom - article storage and publishing service

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom::{
    api::{self, AppState},
    config::Config,
    kv::create_kv,
    store::{create_store, seed_default_article},
};

/// Config file path when `NEWSROOM_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsroom=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting newsroom {}...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = std::env::var("NEWSROOM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load_with_env(&config_path)?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize key-value backend and article store
    let kv = create_kv(&config.kv).await?;
    tracing::info!("Key-value backend initialized: {}", kv.name());

    let store = create_store(&config, kv.clone()).await?;
    tracing::info!("Article store initialized: {}", store.name());

    if config.store.seed_default_article {
        match seed_default_article(store.as_ref()).await {
            Ok(Some(article)) => tracing::info!("Created welcome article '{}'", article.slug),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to seed default article: {}", e),
        }
    }

    // Build application state and warm the article cache
    let state = AppState::new(store, kv, config.auth.clone(), config.upload.clone());
    if !state.auth.is_configured() {
        tracing::warn!("Admin credentials are not configured; admin login is disabled");
    }
    let initial = state.cache.refresh().await;
    match &initial.error {
        Some(error) => tracing::warn!("Article cache started empty: {}", error),
        None => tracing::info!("Article cache loaded {} articles", initial.articles.len()),
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
