//! Capture gate configuration and invocation.

use axum::extract::State;
use axum::Json;
use resource_pool::{CaptureConfig, CaptureGate, CaptureOutcome, UrlSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::parse_scope;

#[derive(Debug, Deserialize)]
pub struct UpsertCaptureConfigRequest {
    pub tenant: String,
    #[serde(default)]
    pub job_types: Vec<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub enabled: bool,
}

fn default_scope() -> String {
    "project".to_string()
}

#[derive(Serialize)]
pub struct UpsertCaptureConfigResponse {
    pub tenant: String,
}

pub async fn upsert_capture_config(
    State(state): State<AppState>,
    Json(request): Json<UpsertCaptureConfigRequest>,
) -> Result<Json<UpsertCaptureConfigResponse>, ApiError> {
    if request.tenant.trim().is_empty() {
        return Err(ApiError::invalid("tenant must not be empty"));
    }
    let scope = parse_scope(&request.scope, Some(&request.tenant))?;
    let config = CaptureConfig {
        tenant: request.tenant.clone(),
        job_types: request.job_types.into_iter().collect::<HashSet<_>>(),
        scope,
        enabled: request.enabled,
    };
    state.store.upsert_capture_config(config).await?;
    Ok(Json(UpsertCaptureConfigResponse {
        tenant: request.tenant,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ref: serde_json::Value,
    pub tenant: String,
    pub job_type: String,
}

#[derive(Serialize)]
pub struct CaptureResponse {
    pub outcome: CaptureOutcome,
}

pub async fn capture_url(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let source = match request.source.as_deref() {
        Some(raw) => UrlSource::parse(raw)
            .ok_or_else(|| ApiError::invalid(format!("unknown source: {raw}")))?,
        None => UrlSource::Task,
    };

    let gate = CaptureGate::new(state.store.clone());
    let outcome = gate
        .capture(
            &request.url,
            source,
            request.source_ref,
            &request.tenant,
            &request.job_type,
        )
        .await?;
    Ok(Json(CaptureResponse { outcome }))
}
