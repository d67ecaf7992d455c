//! Storage trait for pool URLs, site entries, and capture configs.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AppendOutcome, AppendStats, CaptureConfig, EntryType, NewPoolUrl, PoolUrl, Scope, SiteEntry,
    UrlSource,
};

/// Offset pagination. Pages are 1-based on the wire.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: usize,
    pub page_size: usize,
}

impl Page {
    pub const MAX_PAGE_SIZE: usize = 200;

    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 50)
    }
}

/// Filter for pool URL listings.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    pub domain: Option<String>,
    pub source: Option<UrlSource>,
}

/// Filter for site entry listings.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub domain: Option<String>,
    pub entry_type: Option<EntryType>,
    pub enabled: Option<bool>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &SiteEntry) -> bool {
        if let Some(domain) = &self.domain {
            if &entry.domain != domain {
                return false;
            }
        }
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(enabled) = self.enabled {
            if entry.enabled != enabled {
                return false;
            }
        }
        true
    }
}

/// Persistence for the two logical tables per scope.
///
/// All writes are idempotent per-row upserts keyed by normalized URL:
/// appending the same URL twice in one scope leaves one row and reports
/// [`AppendOutcome::Duplicate`]. Concurrent writers racing on the same key
/// are safe — the losing writer simply observes a duplicate.
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Append one raw URL. The store normalizes; an unnormalizable URL is
    /// an `InvalidInput` error.
    async fn append_url(&self, scope: &Scope, url: NewPoolUrl) -> Result<AppendOutcome>;

    /// Bulk append. Unnormalizable rows are counted, not fatal.
    async fn append_urls(&self, scope: &Scope, urls: Vec<NewPoolUrl>) -> Result<AppendStats> {
        let mut stats = AppendStats::default();
        for url in urls {
            if crate::normalize::normalize(&url.url).is_none() {
                stats.invalid += 1;
                continue;
            }
            stats.record(self.append_url(scope, url).await?);
        }
        Ok(stats)
    }

    async fn list_urls(
        &self,
        scope: &Scope,
        filter: &UrlFilter,
        page: &Page,
    ) -> Result<(Vec<PoolUrl>, usize)>;

    /// Distinct domains present in the pool at a scope.
    async fn list_domains(&self, scope: &Scope) -> Result<Vec<String>>;

    /// Insert a site entry, or update mutable metadata (`template`, `tags`,
    /// `enabled`, `extra`, `source_ref`) for an existing key.
    async fn upsert_site_entry(&self, scope: &Scope, entry: SiteEntry) -> Result<AppendOutcome>;

    async fn get_site_entry(&self, scope: &Scope, site_url: &str) -> Result<Option<SiteEntry>>;

    async fn list_site_entries(
        &self,
        scope: &Scope,
        filter: &EntryFilter,
        page: &Page,
    ) -> Result<(Vec<SiteEntry>, usize)>;

    async fn get_capture_config(&self, tenant: &str) -> Result<Option<CaptureConfig>>;

    async fn upsert_capture_config(&self, config: CaptureConfig) -> Result<()>;

    /// Effective read for one key: the tenant row shadows the shared row.
    async fn effective_site_entry(
        &self,
        tenant: Option<&str>,
        site_url: &str,
    ) -> Result<Option<SiteEntry>> {
        if let Some(tenant) = tenant {
            let scope = Scope::Project {
                tenant: tenant.to_string(),
            };
            if let Some(entry) = self.get_site_entry(&scope, site_url).await? {
                return Ok(Some(entry));
            }
        }
        self.get_site_entry(&Scope::Shared, site_url).await
    }

    /// Effective listing: project entries shadow shared entries with the
    /// same normalized key. Computed at read time, never persisted.
    async fn effective_site_entries(
        &self,
        tenant: &str,
        filter: &EntryFilter,
    ) -> Result<Vec<SiteEntry>> {
        let all = Page::new(1, Page::MAX_PAGE_SIZE);
        let scope = Scope::Project {
            tenant: tenant.to_string(),
        };
        let (project, _) = self.list_site_entries(&scope, filter, &all).await?;
        let (shared, _) = self.list_site_entries(&Scope::Shared, filter, &all).await?;

        let mut merged = project;
        let seen: std::collections::HashSet<String> =
            merged.iter().map(|e| e.site_url.clone()).collect();
        merged.extend(shared.into_iter().filter(|e| !seen.contains(&e.site_url)));
        Ok(merged)
    }
}
