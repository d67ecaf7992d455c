//! Discovery runs: synchronous, or spawned with a pollable handle.

use axum::extract::{Path, State};
use axum::Json;
use resource_pool::discovery::{
    BatchDiscoveryDriver, DiscoveryProber, DiscoveryProgress, DiscoveryRequest,
};
use resource_pool::{DiscoveryConfig, PoolStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::parse_scope;

#[derive(Debug, Deserialize)]
pub struct RunDiscoveryRequest {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub skip_known: bool,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub tenant: Option<String>,
    /// Consult the LLM fallback for candidates the rules cannot place.
    #[serde(default)]
    pub use_llm: bool,
    /// Per-probe timeout override, in seconds.
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Wait for the run and return the final progress report.
    #[serde(default)]
    pub sync: bool,
}

fn default_scope() -> String {
    "shared".to_string()
}

fn default_batch_size() -> usize {
    10
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum RunDiscoveryResponse {
    Completed(DiscoveryProgress),
    Spawned { run_id: Uuid },
}

fn build_driver(
    state: &AppState,
    request: &RunDiscoveryRequest,
) -> BatchDiscoveryDriver<
    dyn PoolStore,
    resource_pool::HttpFetcher,
    dyn resource_pool::classify::Classifier,
> {
    let probe_timeout = request
        .probe_timeout_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or(state.config.fetch_timeout);
    let config = DiscoveryConfig {
        concurrency: state.config.discovery_concurrency,
        probe_timeout,
        scan_home_page: true,
        batch_size: request.batch_size,
    };
    let prober = DiscoveryProber::new(state.fetcher.clone(), config);
    BatchDiscoveryDriver::new(
        state.store.clone(),
        prober,
        state.classifier(request.use_llm),
        request.batch_size,
    )
}

pub async fn run_discovery(
    State(state): State<AppState>,
    Json(request): Json<RunDiscoveryRequest>,
) -> Result<Json<RunDiscoveryResponse>, ApiError> {
    let scope = parse_scope(&request.scope, request.tenant.as_deref())?;
    let driver = build_driver(&state, &request);
    let discovery_request = DiscoveryRequest {
        domains: request.domains,
        allow: request.allow,
        deny: request.deny,
        skip_known: request.skip_known,
        scope,
    };

    if request.sync {
        let progress = driver.run(&discovery_request, None, |_| {}).await?;
        return Ok(Json(RunDiscoveryResponse::Completed(progress)));
    }

    let (run_id, cancel) = state.runs.create();
    let runs = state.runs.clone();
    tokio::spawn(async move {
        let on_chunk = {
            let runs = runs.clone();
            move |progress: &DiscoveryProgress| runs.update(run_id, progress.clone())
        };
        match driver.run(&discovery_request, Some(cancel), on_chunk).await {
            Ok(progress) => runs.update(run_id, progress),
            Err(e) => {
                tracing::error!(%run_id, error = %e, "discovery run failed");
                let mut progress = runs.get(run_id).unwrap_or_default();
                progress.finished = true;
                runs.update(run_id, progress);
            }
        }
    });

    Ok(Json(RunDiscoveryResponse::Spawned { run_id }))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscoveryProgress>, ApiError> {
    state
        .runs
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

#[derive(Serialize)]
pub struct CancelRunResponse {
    pub cancelled: bool,
}

pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelRunResponse>, ApiError> {
    if state.runs.cancel(id) {
        Ok(Json(CancelRunResponse { cancelled: true }))
    } else {
        Err(ApiError::NotFound(id.to_string()))
    }
}
