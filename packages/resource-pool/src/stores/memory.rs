//! In-memory storage implementation for testing and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{PoolError, Result};
use crate::normalize::{domain_of, normalize};
use crate::traits::store::{EntryFilter, Page, PoolStore, UrlFilter};
use crate::types::{
    AppendOutcome, CaptureConfig, NewPoolUrl, PoolUrl, Scope, SiteEntry,
};

/// Rows are keyed `(scope key, normalized url)`.
///
/// Useful for tests and development; data is lost on restart.
pub struct MemoryStore {
    urls: RwLock<HashMap<(String, String), PoolUrl>>,
    entries: RwLock<HashMap<(String, String), SiteEntry>>,
    capture_configs: RwLock<HashMap<String, CaptureConfig>>,
}

fn scope_key(scope: &Scope) -> String {
    scope.to_string()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            urls: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
            capture_configs: RwLock::new(HashMap::new()),
        }
    }

    pub fn url_count(&self, scope: &Scope) -> usize {
        let key = scope_key(scope);
        self.urls
            .read()
            .unwrap()
            .keys()
            .filter(|(s, _)| *s == key)
            .count()
    }

    pub fn entry_count(&self, scope: &Scope) -> usize {
        let key = scope_key(scope);
        self.entries
            .read()
            .unwrap()
            .keys()
            .filter(|(s, _)| *s == key)
            .count()
    }
}

#[async_trait]
impl PoolStore for MemoryStore {
    async fn append_url(&self, scope: &Scope, url: NewPoolUrl) -> Result<AppendOutcome> {
        let normalized = normalize(&url.url)
            .ok_or_else(|| PoolError::invalid(format!("unnormalizable URL: {}", url.url)))?;
        let domain = domain_of(&normalized)
            .ok_or_else(|| PoolError::invalid(format!("no host in URL: {normalized}")))?;

        let key = (scope_key(scope), normalized.clone());
        let mut urls = self.urls.write().unwrap();
        if urls.contains_key(&key) {
            return Ok(AppendOutcome::Duplicate);
        }
        urls.insert(
            key,
            PoolUrl {
                url: normalized,
                domain,
                source: url.source,
                source_ref: url.source_ref,
                created_at: Utc::now(),
            },
        );
        Ok(AppendOutcome::Inserted)
    }

    async fn list_urls(
        &self,
        scope: &Scope,
        filter: &UrlFilter,
        page: &Page,
    ) -> Result<(Vec<PoolUrl>, usize)> {
        let key = scope_key(scope);
        let urls = self.urls.read().unwrap();
        let mut rows: Vec<PoolUrl> = urls
            .iter()
            .filter(|((s, _), _)| *s == key)
            .map(|(_, row)| row.clone())
            .filter(|row| {
                filter
                    .domain
                    .as_ref()
                    .map(|d| &row.domain == d)
                    .unwrap_or(true)
                    && filter.source.map(|s| row.source == s).unwrap_or(true)
            })
            .collect();
        rows.sort_by(|a, b| a.url.cmp(&b.url));
        let total = rows.len();
        let rows = rows
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();
        Ok((rows, total))
    }

    async fn list_domains(&self, scope: &Scope) -> Result<Vec<String>> {
        let key = scope_key(scope);
        let urls = self.urls.read().unwrap();
        let mut domains: Vec<String> = urls
            .iter()
            .filter(|((s, _), _)| *s == key)
            .map(|(_, row)| row.domain.clone())
            .collect();
        domains.sort();
        domains.dedup();
        Ok(domains)
    }

    async fn upsert_site_entry(&self, scope: &Scope, entry: SiteEntry) -> Result<AppendOutcome> {
        let key = (scope_key(scope), entry.site_url.clone());
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(&key) {
            Some(existing) => {
                // Identity and creation time survive; metadata updates.
                existing.template = entry.template;
                existing.source_ref = entry.source_ref;
                existing.tags = entry.tags;
                existing.enabled = entry.enabled;
                existing.extra = entry.extra;
                Ok(AppendOutcome::Duplicate)
            }
            None => {
                entries.insert(key, entry);
                Ok(AppendOutcome::Inserted)
            }
        }
    }

    async fn get_site_entry(&self, scope: &Scope, site_url: &str) -> Result<Option<SiteEntry>> {
        let normalized = normalize(site_url).unwrap_or_else(|| site_url.to_string());
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(&(scope_key(scope), normalized))
            .cloned())
    }

    async fn list_site_entries(
        &self,
        scope: &Scope,
        filter: &EntryFilter,
        page: &Page,
    ) -> Result<(Vec<SiteEntry>, usize)> {
        let key = scope_key(scope);
        let entries = self.entries.read().unwrap();
        let mut rows: Vec<SiteEntry> = entries
            .iter()
            .filter(|((s, _), _)| *s == key)
            .map(|(_, row)| row.clone())
            .filter(|row| filter.matches(row))
            .collect();
        rows.sort_by(|a, b| a.site_url.cmp(&b.site_url));
        let total = rows.len();
        let rows = rows
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();
        Ok((rows, total))
    }

    async fn get_capture_config(&self, tenant: &str) -> Result<Option<CaptureConfig>> {
        Ok(self
            .capture_configs
            .read()
            .unwrap()
            .get(tenant)
            .cloned())
    }

    async fn upsert_capture_config(&self, config: CaptureConfig) -> Result<()> {
        self.capture_configs
            .write()
            .unwrap()
            .insert(config.tenant.clone(), config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryType, NewSiteEntry, UrlSource};

    fn project(tenant: &str) -> Scope {
        Scope::Project {
            tenant: tenant.to_string(),
        }
    }

    #[tokio::test]
    async fn test_double_append_same_scope_is_one_row() {
        let store = MemoryStore::new();
        let first = store
            .append_url(
                &Scope::Shared,
                NewPoolUrl::new("https://example.com/a", UrlSource::Manual),
            )
            .await
            .unwrap();
        let second = store
            .append_url(
                &Scope::Shared,
                NewPoolUrl::new("https://example.com/a#frag", UrlSource::Manual),
            )
            .await
            .unwrap();

        assert_eq!(first, AppendOutcome::Inserted);
        assert_eq!(second, AppendOutcome::Duplicate);
        assert_eq!(store.url_count(&Scope::Shared), 1);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = MemoryStore::new();
        for scope in [&Scope::Shared, &project("acme")] {
            let outcome = store
                .append_url(
                    scope,
                    NewPoolUrl::new("https://example.com/a", UrlSource::Manual),
                )
                .await
                .unwrap();
            assert_eq!(outcome, AppendOutcome::Inserted);
        }
        assert_eq!(store.url_count(&Scope::Shared), 1);
        assert_eq!(store.url_count(&project("acme")), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let store = MemoryStore::new();
        let err = store
            .append_url(
                &Scope::Shared,
                NewPoolUrl::new("ftp://example.com/a", UrlSource::Manual),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_bulk_append_counts_invalid_rows() {
        let store = MemoryStore::new();
        let stats = store
            .append_urls(
                &Scope::Shared,
                vec![
                    NewPoolUrl::new("https://example.com/a", UrlSource::Document),
                    NewPoolUrl::new("https://example.com/a", UrlSource::Document),
                    NewPoolUrl::new("not a url", UrlSource::Document),
                ],
            )
            .await
            .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.invalid, 1);
    }

    #[tokio::test]
    async fn test_upsert_entry_updates_metadata() {
        let store = MemoryStore::new();
        let entry = NewSiteEntry::new("https://example.com/feed", EntryType::Rss, UrlSource::Manual)
            .into_entry()
            .unwrap();
        assert_eq!(
            store
                .upsert_site_entry(&Scope::Shared, entry.clone())
                .await
                .unwrap(),
            AppendOutcome::Inserted
        );

        let mut updated = entry;
        updated.enabled = false;
        updated.tags = vec!["news".to_string()];
        assert_eq!(
            store
                .upsert_site_entry(&Scope::Shared, updated)
                .await
                .unwrap(),
            AppendOutcome::Duplicate
        );

        let stored = store
            .get_site_entry(&Scope::Shared, "https://example.com/feed")
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.enabled);
        assert_eq!(stored.tags, vec!["news".to_string()]);
    }

    #[tokio::test]
    async fn test_effective_read_project_shadows_shared() {
        let store = MemoryStore::new();
        let shared = NewSiteEntry::new("https://example.com/feed", EntryType::Rss, UrlSource::Manual)
            .into_entry()
            .unwrap();
        store
            .upsert_site_entry(&Scope::Shared, shared)
            .await
            .unwrap();

        let mut tenant_entry =
            NewSiteEntry::new("https://example.com/feed", EntryType::Rss, UrlSource::Manual)
                .into_entry()
                .unwrap();
        tenant_entry.enabled = false;
        store
            .upsert_site_entry(&project("acme"), tenant_entry)
            .await
            .unwrap();

        // Tenant view sees the shadowing row; others see the shared one.
        let effective = store
            .effective_site_entry(Some("acme"), "https://example.com/feed")
            .await
            .unwrap()
            .unwrap();
        assert!(!effective.enabled);

        let effective = store
            .effective_site_entry(Some("other"), "https://example.com/feed")
            .await
            .unwrap()
            .unwrap();
        assert!(effective.enabled);

        let effective = store
            .effective_site_entry(None, "https://example.com/feed")
            .await
            .unwrap()
            .unwrap();
        assert!(effective.enabled);
    }

    #[tokio::test]
    async fn test_effective_listing_merges() {
        let store = MemoryStore::new();
        for (scope, url) in [
            (Scope::Shared, "https://a.com/feed"),
            (Scope::Shared, "https://b.com/feed"),
            (project("acme"), "https://a.com/feed"),
            (project("acme"), "https://c.com/feed"),
        ] {
            let entry = NewSiteEntry::new(url, EntryType::Rss, UrlSource::Manual)
                .into_entry()
                .unwrap();
            store.upsert_site_entry(&scope, entry).await.unwrap();
        }

        let merged = store
            .effective_site_entries("acme", &EntryFilter::default())
            .await
            .unwrap();
        // a.com from the project scope, b.com from shared, c.com from project.
        assert_eq!(merged.len(), 3);
    }

    #[tokio::test]
    async fn test_list_entries_filters_and_pages() {
        let store = MemoryStore::new();
        for url in [
            "https://a.com/feed",
            "https://a.com/sitemap.xml",
            "https://b.com/feed",
        ] {
            let entry_type = if url.contains("sitemap") {
                EntryType::Sitemap
            } else {
                EntryType::Rss
            };
            let entry = NewSiteEntry::new(url, entry_type, UrlSource::Manual)
                .into_entry()
                .unwrap();
            store.upsert_site_entry(&Scope::Shared, entry).await.unwrap();
        }

        let filter = EntryFilter {
            entry_type: Some(EntryType::Rss),
            ..Default::default()
        };
        let (rows, total) = store
            .list_site_entries(&Scope::Shared, &filter, &Page::new(1, 1))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);

        let filter = EntryFilter {
            domain: Some("a.com".to_string()),
            ..Default::default()
        };
        let (_, total) = store
            .list_site_entries(&Scope::Shared, &filter, &Page::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
    }
}
