//! Unified search over an item's bound site entries.

use axum::extract::State;
use axum::Json;
use resource_pool::{SearchConfig, SearchReport, UnifiedSearch, UnifiedSearchRequest,
    UnifiedSearchService};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn unified_search(
    State(state): State<AppState>,
    Json(request): Json<UnifiedSearchRequest>,
) -> Result<Json<SearchReport>, ApiError> {
    if request.query_terms.iter().all(|t| t.trim().is_empty()) {
        return Err(ApiError::invalid("query_terms must not be empty"));
    }

    let config = SearchConfig {
        concurrency: state.config.search_concurrency,
        ..Default::default()
    };
    let service = UnifiedSearchService::new(
        state.store.clone(),
        state.resolver.clone(),
        state.ingestor.clone(),
        UnifiedSearch::new(state.fetcher.clone(), config),
    );

    let report = service.run(&request).await?;
    Ok(Json(report))
}
