//! Environment-based configuration.

use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,

    /// Chat-completion transport for the classification fallback. Optional:
    /// without a key, discovery runs rule-only regardless of `use_llm`.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,

    pub fetch_timeout: Duration,
    pub discovery_concurrency: usize,
    pub search_concurrency: usize,

    /// JSON file mapping item keys to their site-entry bindings.
    pub source_items_path: Option<String>,
    /// Endpoint of the document-ingestion collaborator.
    pub ingest_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env if present; ignore when absent.
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a number")?;

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let fetch_timeout_secs: u64 = std::env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("FETCH_TIMEOUT_SECS must be a number")?;

        let discovery_concurrency = std::env::var("DISCOVERY_CONCURRENCY")
            .unwrap_or_else(|_| "6".to_string())
            .parse()
            .context("DISCOVERY_CONCURRENCY must be a number")?;

        let search_concurrency = std::env::var("SEARCH_CONCURRENCY")
            .unwrap_or_else(|_| "6".to_string())
            .parse()
            .context("SEARCH_CONCURRENCY must be a number")?;

        Ok(Self {
            port,
            database_url,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            discovery_concurrency,
            search_concurrency,
            source_items_path: std::env::var("SOURCE_ITEMS_PATH").ok(),
            ingest_url: std::env::var("INGEST_URL").ok(),
        })
    }
}
