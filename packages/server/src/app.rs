//! Application setup and router assembly.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use resource_pool::classify::Classifier;
use resource_pool::{
    DocumentIngestor, HttpFetcher, LlmClassifier, PoolStore, PostgresStore, RuleClassifier,
    SourceItemResolver,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::completer::OpenAiCompleter;
use crate::config::Config;
use crate::ingest::HttpIngestor;
use crate::resolver::FileItemResolver;
use crate::routes;
use crate::runs::DiscoveryRuns;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub store: Arc<dyn PoolStore>,
    pub fetcher: Arc<HttpFetcher>,
    pub completer: Option<Arc<OpenAiCompleter>>,
    pub resolver: Arc<dyn SourceItemResolver>,
    pub ingestor: Option<Arc<dyn DocumentIngestor>>,
    pub runs: DiscoveryRuns,
    pub config: Arc<Config>,
}

impl AppState {
    /// Classifier for one request: the validated LLM chain when the caller
    /// opts in and a completer is configured, the rule engine otherwise.
    pub fn classifier(&self, use_llm: bool) -> Arc<dyn Classifier> {
        match (&self.completer, use_llm) {
            (Some(completer), true) => Arc::new(LlmClassifier::new(completer.clone())),
            _ => Arc::new(RuleClassifier::new()),
        }
    }
}

/// Build the Axum application router.
pub async fn build_app(pool: PgPool, config: Config) -> Result<Router> {
    let store = PostgresStore::from_pool(pool.clone())
        .await
        .context("Failed to initialize store")?;

    let fetcher = HttpFetcher::new(config.fetch_timeout)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP fetcher: {e}"))?;

    let completer = config.openai_api_key.as_ref().map(|key| {
        Arc::new(OpenAiCompleter::new(
            key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        ))
    });
    if completer.is_none() {
        tracing::info!("No OPENAI_API_KEY set - classification runs rule-only");
    }

    let resolver: Arc<dyn SourceItemResolver> = match &config.source_items_path {
        Some(path) => Arc::new(FileItemResolver::load(path)?),
        None => {
            tracing::info!("No SOURCE_ITEMS_PATH set - unified search has no bound items");
            Arc::new(FileItemResolver::empty())
        }
    };

    let ingestor: Option<Arc<dyn DocumentIngestor>> = config
        .ingest_url
        .as_ref()
        .map(|url| Arc::new(HttpIngestor::new(url.clone())) as Arc<dyn DocumentIngestor>);

    let state = AppState {
        db_pool: pool,
        store: Arc::new(store),
        fetcher: Arc::new(fetcher),
        completer,
        resolver,
        ingestor,
        runs: DiscoveryRuns::new(),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/health", get(routes::health::health_handler))
        .route(
            "/resource-pool/site-entries",
            post(routes::site_entries::upsert_site_entry)
                .get(routes::site_entries::list_site_entries),
        )
        .route("/resource-pool/urls", post(routes::urls::append_urls))
        .route(
            "/resource-pool/discovery/run",
            post(routes::discovery::run_discovery),
        )
        .route(
            "/resource-pool/discovery/runs/:id",
            get(routes::discovery::get_run),
        )
        .route(
            "/resource-pool/discovery/runs/:id/cancel",
            post(routes::discovery::cancel_run),
        )
        .route(
            "/resource-pool/unified-search",
            post(routes::unified_search::unified_search),
        )
        .route(
            "/resource-pool/capture-config",
            post(routes::capture::upsert_capture_config),
        )
        .route("/resource-pool/capture", post(routes::capture::capture_url))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
