//! Site-entry upsert and listing.

use axum::extract::{Query, State};
use axum::Json;
use resource_pool::traits::{EntryFilter, Page};
use resource_pool::{AppendOutcome, EntryType, NewSiteEntry, SiteEntry, UrlSource};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::parse_scope;

#[derive(Debug, Deserialize)]
pub struct UpsertSiteEntryRequest {
    pub scope: String,
    #[serde(default)]
    pub tenant: Option<String>,
    pub site_url: String,
    pub entry_type: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ref: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub extra: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

#[derive(Serialize)]
pub struct UpsertSiteEntryResponse {
    pub site_url: String,
    pub outcome: AppendOutcome,
}

pub async fn upsert_site_entry(
    State(state): State<AppState>,
    Json(request): Json<UpsertSiteEntryRequest>,
) -> Result<Json<UpsertSiteEntryResponse>, ApiError> {
    let scope = parse_scope(&request.scope, request.tenant.as_deref())?;
    let entry_type = EntryType::parse(&request.entry_type)
        .ok_or_else(|| ApiError::invalid(format!("unknown entry_type: {}", request.entry_type)))?;
    let source = match request.source.as_deref() {
        Some(raw) => UrlSource::parse(raw)
            .ok_or_else(|| ApiError::invalid(format!("unknown source: {raw}")))?,
        None => UrlSource::Manual,
    };

    let mut new_entry = NewSiteEntry::new(&request.site_url, entry_type, source);
    new_entry.template = request.template;
    new_entry.source_ref = request.source_ref;
    new_entry.tags = request.tags;
    new_entry.enabled = request.enabled;
    new_entry.extra = request.extra;

    let entry = new_entry.into_entry().map_err(ApiError::invalid)?;
    let site_url = entry.site_url.clone();
    let outcome = state.store.upsert_site_entry(&scope, entry).await?;

    Ok(Json(UpsertSiteEntryResponse { site_url, outcome }))
}

#[derive(Debug, Deserialize)]
pub struct ListSiteEntriesQuery {
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_scope() -> String {
    "shared".to_string()
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

#[derive(Serialize)]
pub struct ListSiteEntriesResponse {
    pub entries: Vec<SiteEntry>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

pub async fn list_site_entries(
    State(state): State<AppState>,
    Query(query): Query<ListSiteEntriesQuery>,
) -> Result<Json<ListSiteEntriesResponse>, ApiError> {
    let entry_type = match query.entry_type.as_deref() {
        Some(raw) => Some(
            EntryType::parse(raw)
                .ok_or_else(|| ApiError::invalid(format!("unknown entry_type: {raw}")))?,
        ),
        None => None,
    };
    let filter = EntryFilter {
        domain: query.domain.clone(),
        entry_type,
        enabled: query.enabled,
    };
    let page = Page::new(query.page, query.page_size);

    // `effective` merges the tenant's rows over shared at read time.
    let (entries, total) = if query.scope == "effective" {
        let tenant = query
            .tenant
            .as_deref()
            .ok_or_else(|| ApiError::invalid("scope=effective requires a tenant key"))?;
        let merged = state.store.effective_site_entries(tenant, &filter).await?;
        let total = merged.len();
        let entries = merged
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();
        (entries, total)
    } else {
        let scope = parse_scope(&query.scope, query.tenant.as_deref())?;
        state.store.list_site_entries(&scope, &filter, &page).await?
    };

    Ok(Json(ListSiteEntriesResponse {
        entries,
        total,
        page: page.page,
        page_size: page.page_size,
    }))
}
