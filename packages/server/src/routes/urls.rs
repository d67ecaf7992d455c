//! Bulk append of raw URLs into the pool.

use axum::extract::State;
use axum::Json;
use resource_pool::{AppendStats, NewPoolUrl, UrlSource};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::parse_scope;

#[derive(Debug, Deserialize)]
pub struct AppendUrlsRequest {
    pub scope: String,
    #[serde(default)]
    pub tenant: Option<String>,
    pub urls: Vec<UrlRow>,
}

#[derive(Debug, Deserialize)]
pub struct UrlRow {
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ref: serde_json::Value,
}

#[derive(Serialize)]
pub struct AppendUrlsResponse {
    #[serde(flatten)]
    pub stats: AppendStats,
}

pub async fn append_urls(
    State(state): State<AppState>,
    Json(request): Json<AppendUrlsRequest>,
) -> Result<Json<AppendUrlsResponse>, ApiError> {
    let scope = parse_scope(&request.scope, request.tenant.as_deref())?;

    let mut rows = Vec::with_capacity(request.urls.len());
    for row in request.urls {
        let source = match row.source.as_deref() {
            Some(raw) => UrlSource::parse(raw)
                .ok_or_else(|| ApiError::invalid(format!("unknown source: {raw}")))?,
            None => UrlSource::Manual,
        };
        rows.push(NewPoolUrl::new(row.url, source).with_source_ref(row.source_ref));
    }

    let stats = state.store.append_urls(&scope, rows).await?;
    Ok(Json(AppendUrlsResponse { stats }))
}
