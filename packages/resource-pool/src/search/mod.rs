//! Unified search: fan out across an item's bound site entries, fetch and
//! parse each according to its entry type, and merge deduplicated document
//! candidates.
//!
//! Entries run concurrently over a bounded worker pool. Each worker returns
//! a self-contained [`EntryOutcome`]; nothing is shared between workers and
//! a failing entry contributes an error record plus an empty candidate set,
//! never an aborted search.

pub mod feed;
pub mod sitemap;
pub mod template;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{PoolError, Result};
use crate::normalize::{same_domain, strip_tracking};
use crate::search::sitemap::SitemapLimits;
use crate::traits::{DocumentIngestor, IngestStats, PageFetcher, PoolStore, SourceItemResolver};
use crate::types::{AppendStats, EntryType, NewPoolUrl, Scope, SearchConfig, SiteEntry, UrlSource};

/// One bound entry as resolved against the store's effective view.
#[derive(Debug, Clone)]
pub enum BoundEntry {
    Resolved(SiteEntry),
    /// Bound URL with no site entry at any visible scope.
    Missing(String),
}

/// Why one entry contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryError {
    /// The entry's type disagrees with the item's declared expectation.
    BindingMismatch {
        expected: EntryType,
        actual: EntryType,
    },
    NotFound,
    Disabled,
    Fetch { message: String },
    Parse { message: String },
}

/// Per-entry diagnostics, always reported alongside the merged candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDiagnostics {
    pub site_url: String,
    pub entry_type: Option<EntryType>,
    pub candidates_found: usize,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
}

struct EntryOutcome {
    diagnostics: EntryDiagnostics,
    candidates: Vec<String>,
}

/// Full result of one unified search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub candidates: Vec<String>,
    pub entries: Vec<EntryDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_writes: Option<AppendStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
}

/// The fan-out/fan-in executor.
pub struct UnifiedSearch<F> {
    fetcher: Arc<F>,
    config: SearchConfig,
}

impl<F: PageFetcher + 'static> UnifiedSearch<F> {
    pub fn new(fetcher: Arc<F>, config: SearchConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Execute across bound entries, returning merged candidates (deduped
    /// by normalized URL, first-seen order, truncated to `max_candidates`)
    /// plus per-entry diagnostics in binding order.
    pub async fn execute(
        &self,
        bound: Vec<BoundEntry>,
        expected_entry_type: Option<EntryType>,
        terms: &[String],
        max_candidates: usize,
    ) -> (Vec<String>, Vec<EntryDiagnostics>) {
        let outcomes: Vec<EntryOutcome> = stream::iter(bound.into_iter().map(|entry| {
            let fetcher = self.fetcher.clone();
            let config = self.config.clone();
            let terms = terms.to_vec();
            async move { run_entry(fetcher, &config, entry, expected_entry_type, &terms).await }
        }))
        .buffered(self.config.workers())
        .collect()
        .await;

        let mut merged: Vec<String> = Vec::new();
        let mut diagnostics = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            for candidate in outcome.candidates {
                if merged.len() >= max_candidates {
                    break;
                }
                if !merged.contains(&candidate) {
                    merged.push(candidate);
                }
            }
            diagnostics.push(outcome.diagnostics);
        }

        (merged, diagnostics)
    }
}

async fn run_entry<F: PageFetcher>(
    fetcher: Arc<F>,
    config: &SearchConfig,
    bound: BoundEntry,
    expected_entry_type: Option<EntryType>,
    terms: &[String],
) -> EntryOutcome {
    let entry = match bound {
        BoundEntry::Resolved(entry) => entry,
        BoundEntry::Missing(site_url) => {
            return EntryOutcome {
                diagnostics: EntryDiagnostics {
                    site_url,
                    entry_type: None,
                    candidates_found: 0,
                    fallback_used: false,
                    error: Some(EntryError::NotFound),
                },
                candidates: Vec::new(),
            }
        }
    };

    let mut diagnostics = EntryDiagnostics {
        site_url: entry.site_url.clone(),
        entry_type: Some(entry.entry_type),
        candidates_found: 0,
        fallback_used: false,
        error: None,
    };

    if !entry.enabled {
        diagnostics.error = Some(EntryError::Disabled);
        return EntryOutcome {
            diagnostics,
            candidates: Vec::new(),
        };
    }

    if let Some(expected) = expected_entry_type {
        if entry.entry_type != expected {
            diagnostics.error = Some(EntryError::BindingMismatch {
                expected,
                actual: entry.entry_type,
            });
            return EntryOutcome {
                diagnostics,
                candidates: Vec::new(),
            };
        }
    }

    let raw = match fetch_candidates(fetcher.as_ref(), config, &entry, terms).await {
        Ok(raw) => raw,
        Err(error) => {
            warn!(url = %entry.site_url, error = ?error, "entry skipped");
            diagnostics.error = Some(error);
            return EntryOutcome {
                diagnostics,
                candidates: Vec::new(),
            };
        }
    };

    // Tracking params stripped and re-normalized; anything unnormalizable
    // is dropped here.
    let mut cleaned: Vec<String> = Vec::new();
    for candidate in raw {
        if let Some(url) = strip_tracking(&candidate) {
            if !cleaned.contains(&url) {
                cleaned.push(url);
            }
        }
    }

    let (kept, fallback_used) = filter_by_terms(cleaned, terms, config.fallback_keep);
    diagnostics.candidates_found = kept.len();
    diagnostics.fallback_used = fallback_used;
    debug!(
        url = %entry.site_url,
        candidates = kept.len(),
        fallback_used,
        "entry complete"
    );

    EntryOutcome {
        diagnostics,
        candidates: kept,
    }
}

/// Dispatch one entry to its fetch-and-extract strategy.
async fn fetch_candidates<F: PageFetcher>(
    fetcher: &F,
    config: &SearchConfig,
    entry: &SiteEntry,
    terms: &[String],
) -> std::result::Result<Vec<String>, EntryError> {
    match entry.entry_type {
        EntryType::Rss => {
            let page = fetcher
                .fetch(&entry.site_url)
                .await
                .map_err(|e| EntryError::Fetch {
                    message: e.to_string(),
                })?;
            feed::extract_feed_urls(&page.body).map_err(|message| EntryError::Parse { message })
        }
        EntryType::Sitemap => {
            let limits = SitemapLimits {
                max_depth: config.sitemap_max_depth,
                fetch_budget: config.sitemap_fetch_budget,
            };
            let (urls, errors) =
                sitemap::collect_sitemap_urls(fetcher, &entry.site_url, limits).await;
            if urls.is_empty() {
                if let Some(first) = errors.into_iter().next() {
                    return Err(EntryError::Parse { message: first });
                }
            }
            Ok(urls)
        }
        EntryType::SearchTemplate => {
            let template = entry.template.as_deref().ok_or(EntryError::Parse {
                message: "entry has no template".to_string(),
            })?;
            let rendered = template::render_template(template, terms);
            let page = fetcher.fetch(&rendered).await.map_err(|e| EntryError::Fetch {
                message: e.to_string(),
            })?;
            let anchors = template::extract_anchors(&page.text(), &page.final_url);
            Ok(anchors
                .into_iter()
                .filter(|a| same_domain(a, &entry.site_url))
                .collect())
        }
        // The entry URL is itself the only candidate.
        EntryType::DomainRoot | EntryType::OfficialApi => Ok(vec![entry.site_url.clone()]),
    }
}

/// Term filtering with fallback: strict case-insensitive substring match
/// first; when nothing matches, keep the first `fallback_keep` candidates
/// and flag the contribution. Sites whose result URLs never embed the query
/// text would otherwise always come back empty.
fn filter_by_terms(
    candidates: Vec<String>,
    terms: &[String],
    fallback_keep: usize,
) -> (Vec<String>, bool) {
    if terms.is_empty() || candidates.is_empty() {
        return (candidates, false);
    }

    let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    let matching: Vec<String> = candidates
        .iter()
        .filter(|c| {
            let candidate = c.to_lowercase();
            lowered.iter().any(|term| candidate.contains(term))
        })
        .cloned()
        .collect();

    if matching.is_empty() {
        let kept: Vec<String> = candidates.into_iter().take(fallback_keep).collect();
        (kept, true)
    } else {
        (matching, false)
    }
}

/// A unified-search invocation for one source item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedSearchRequest {
    pub item_key: String,
    #[serde(default)]
    pub tenant: Option<String>,
    pub query_terms: Vec<String>,
    #[serde(default)]
    pub max_candidates: Option<usize>,
    #[serde(default)]
    pub write_to_pool: bool,
    #[serde(default)]
    pub auto_ingest: bool,
}

/// Resolves the item binding, executes the search, and handles the optional
/// pool write-back and ingestion hand-off.
pub struct UnifiedSearchService<F> {
    store: Arc<dyn PoolStore>,
    resolver: Arc<dyn SourceItemResolver>,
    ingestor: Option<Arc<dyn DocumentIngestor>>,
    executor: UnifiedSearch<F>,
}

impl<F: PageFetcher + 'static> UnifiedSearchService<F> {
    pub fn new(
        store: Arc<dyn PoolStore>,
        resolver: Arc<dyn SourceItemResolver>,
        ingestor: Option<Arc<dyn DocumentIngestor>>,
        executor: UnifiedSearch<F>,
    ) -> Self {
        Self {
            store,
            resolver,
            ingestor,
            executor,
        }
    }

    pub async fn run(&self, request: &UnifiedSearchRequest) -> Result<SearchReport> {
        let binding = self
            .resolver
            .resolve(&request.item_key, request.tenant.as_deref())
            .await?
            .ok_or_else(|| PoolError::NotFound {
                key: request.item_key.clone(),
            })?;

        let mut bound = Vec::with_capacity(binding.site_entries.len());
        for site_url in &binding.site_entries {
            match self
                .store
                .effective_site_entry(request.tenant.as_deref(), site_url)
                .await?
            {
                Some(entry) => bound.push(BoundEntry::Resolved(entry)),
                None => bound.push(BoundEntry::Missing(site_url.clone())),
            }
        }

        let max_candidates = request
            .max_candidates
            .unwrap_or(self.executor.config().max_candidates);
        let (candidates, entries) = self
            .executor
            .execute(
                bound,
                binding.expected_entry_type,
                &request.query_terms,
                max_candidates,
            )
            .await;

        let pool_writes = if request.write_to_pool && !candidates.is_empty() {
            let scope = match request.tenant.as_deref() {
                Some(tenant) => Scope::Project {
                    tenant: tenant.to_string(),
                },
                None => Scope::Shared,
            };
            let rows: Vec<NewPoolUrl> = candidates
                .iter()
                .map(|url| {
                    NewPoolUrl::new(url, UrlSource::UnifiedSearch)
                        .with_source_ref(json!({ "item_key": request.item_key }))
                })
                .collect();
            Some(self.store.append_urls(&scope, rows).await?)
        } else {
            None
        };

        let ingest = match (&self.ingestor, request.auto_ingest) {
            (Some(ingestor), true) if !candidates.is_empty() => Some(
                ingestor
                    .ingest(&candidates, request.tenant.as_deref())
                    .await?,
            ),
            _ => None,
        };

        Ok(SearchReport {
            candidates,
            entries,
            pool_writes,
            ingest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchResult};
    use crate::traits::{FetchedPage, ItemBinding};
    use crate::types::{Capabilities, UrlSource};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
            self.pages
                .get(url)
                .map(|body| FetchedPage::new(url, 200, body.clone().into_bytes()))
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn entry(site_url: &str, entry_type: EntryType, template: Option<&str>) -> SiteEntry {
        SiteEntry {
            site_url: site_url.to_string(),
            domain: crate::normalize::domain_of(site_url).unwrap(),
            entry_type,
            template: template.map(|t| t.to_string()),
            capabilities: Capabilities::for_entry_type(entry_type),
            source: UrlSource::Manual,
            source_ref: serde_json::Value::Null,
            tags: vec![],
            enabled: true,
            extra: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    fn executor(fetcher: Arc<MapFetcher>) -> UnifiedSearch<MapFetcher> {
        UnifiedSearch::new(fetcher, SearchConfig::default())
    }

    #[tokio::test]
    async fn test_search_template_end_to_end() {
        let results_page = r#"
            <a href="/products/widget-a">Widget A</a>
            <a href="/products/widget-b?utm_source=search">Widget B</a>
            <a href="/about">About</a>
            <a href="https://ads.example.net/click">Ad</a>
        "#;
        let fetcher = MapFetcher::new(&[("https://example.com/search?q=widget", results_page)]);
        let bound = vec![BoundEntry::Resolved(entry(
            "https://example.com/search",
            EntryType::SearchTemplate,
            Some("https://example.com/search?q={{query}}"),
        ))];

        let (candidates, diagnostics) = executor(fetcher)
            .execute(bound, None, &["widget".to_string()], 100)
            .await;

        // Same-domain anchors containing the term, tracking stripped.
        assert_eq!(
            candidates,
            vec![
                "https://example.com/products/widget-a".to_string(),
                "https://example.com/products/widget-b".to_string(),
            ]
        );
        assert!(!diagnostics[0].fallback_used);
        assert!(diagnostics[0].error.is_none());
    }

    #[tokio::test]
    async fn test_term_fallback_caps_and_flags() {
        // No anchor embeds the query text: first K kept, flagged.
        let anchors: String = (0..20)
            .map(|i| format!(r#"<a href="/doc/{i}">doc</a>"#))
            .collect();
        let fetcher = MapFetcher::new(&[("https://example.com/search?q=widget", anchors.as_str())]);
        let bound = vec![BoundEntry::Resolved(entry(
            "https://example.com/search",
            EntryType::SearchTemplate,
            Some("https://example.com/search?q={{query}}"),
        ))];

        let (candidates, diagnostics) = executor(fetcher)
            .execute(bound, None, &["widget".to_string()], 100)
            .await;

        assert_eq!(candidates.len(), SearchConfig::default().fallback_keep);
        assert!(diagnostics[0].fallback_used);
    }

    #[tokio::test]
    async fn test_fallback_does_not_trigger_when_any_match() {
        let html = r#"<a href="/widget-page">w</a><a href="/other">o</a>"#;
        let fetcher = MapFetcher::new(&[("https://example.com/search?q=widget", html)]);
        let bound = vec![BoundEntry::Resolved(entry(
            "https://example.com/search",
            EntryType::SearchTemplate,
            Some("https://example.com/search?q={{query}}"),
        ))];

        let (candidates, diagnostics) = executor(fetcher)
            .execute(bound, None, &["widget".to_string()], 100)
            .await;
        assert_eq!(candidates, vec!["https://example.com/widget-page".to_string()]);
        assert!(!diagnostics[0].fallback_used);
    }

    #[tokio::test]
    async fn test_binding_mismatch_skips_entry_not_search() {
        let feed = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>
            <item><link>https://example.com/widget-news</link></item>
            </channel></rss>"#;
        let fetcher = MapFetcher::new(&[("https://example.com/feed", feed)]);
        let bound = vec![
            BoundEntry::Resolved(entry(
                "https://example.com/wrong",
                EntryType::DomainRoot,
                None,
            )),
            BoundEntry::Resolved(entry("https://example.com/feed", EntryType::Rss, None)),
        ];

        let (candidates, diagnostics) = executor(fetcher)
            .execute(bound, Some(EntryType::Rss), &["widget".to_string()], 100)
            .await;

        assert_eq!(
            diagnostics[0].error,
            Some(EntryError::BindingMismatch {
                expected: EntryType::Rss,
                actual: EntryType::DomainRoot,
            })
        );
        // The sibling entry still produced results.
        assert_eq!(candidates, vec!["https://example.com/widget-news".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_per_entry() {
        let fetcher = MapFetcher::new(&[]);
        let bound = vec![
            BoundEntry::Resolved(entry("https://example.com/feed", EntryType::Rss, None)),
            BoundEntry::Resolved(entry("https://example.com/", EntryType::DomainRoot, None)),
        ];

        let (candidates, diagnostics) = executor(fetcher).execute(bound, None, &[], 100).await;

        assert!(matches!(
            diagnostics[0].error,
            Some(EntryError::Fetch { .. })
        ));
        assert_eq!(candidates, vec!["https://example.com/".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_dedupes_and_truncates() {
        let bound = vec![
            BoundEntry::Resolved(entry("https://example.com/", EntryType::DomainRoot, None)),
            BoundEntry::Resolved(entry("https://example.com/", EntryType::DomainRoot, None)),
            BoundEntry::Resolved(entry("https://example.com/b", EntryType::DomainRoot, None)),
        ];
        let fetcher = MapFetcher::new(&[]);

        let (candidates, _) = executor(fetcher).execute(bound, None, &[], 1).await;
        assert_eq!(candidates, vec!["https://example.com/".to_string()]);
    }

    #[tokio::test]
    async fn test_disabled_entry_skipped() {
        let mut disabled = entry("https://example.com/feed", EntryType::Rss, None);
        disabled.enabled = false;
        let fetcher = MapFetcher::new(&[]);

        let (candidates, diagnostics) = executor(fetcher)
            .execute(vec![BoundEntry::Resolved(disabled)], None, &[], 100)
            .await;
        assert!(candidates.is_empty());
        assert_eq!(diagnostics[0].error, Some(EntryError::Disabled));
    }

    #[tokio::test]
    async fn test_missing_entry_reported() {
        let fetcher = MapFetcher::new(&[]);
        let (_, diagnostics) = executor(fetcher)
            .execute(
                vec![BoundEntry::Missing("https://example.com/gone".into())],
                None,
                &[],
                100,
            )
            .await;
        assert_eq!(diagnostics[0].error, Some(EntryError::NotFound));
    }

    mod service {
        use super::*;
        use crate::stores::MemoryStore;

        struct FixedResolver {
            binding: Option<ItemBinding>,
        }

        #[async_trait]
        impl SourceItemResolver for FixedResolver {
            async fn resolve(
                &self,
                _item_key: &str,
                _tenant: Option<&str>,
            ) -> crate::error::Result<Option<ItemBinding>> {
                Ok(self.binding.clone())
            }
        }

        struct CountingIngestor;

        #[async_trait]
        impl DocumentIngestor for CountingIngestor {
            async fn ingest(
                &self,
                urls: &[String],
                _tenant: Option<&str>,
            ) -> crate::error::Result<IngestStats> {
                Ok(IngestStats {
                    inserted: urls.len(),
                    updated: 0,
                    skipped: 0,
                })
            }
        }

        #[tokio::test]
        async fn test_service_writes_pool_and_ingests() {
            let store = Arc::new(MemoryStore::new());
            let root = entry("https://example.com/", EntryType::DomainRoot, None);
            store
                .upsert_site_entry(&Scope::Shared, root)
                .await
                .unwrap();

            let resolver = Arc::new(FixedResolver {
                binding: Some(ItemBinding {
                    site_entries: vec!["https://example.com/".to_string()],
                    expected_entry_type: None,
                }),
            });

            let service = UnifiedSearchService::new(
                store.clone(),
                resolver,
                Some(Arc::new(CountingIngestor)),
                UnifiedSearch::new(MapFetcher::new(&[]), SearchConfig::default()),
            );

            let report = service
                .run(&UnifiedSearchRequest {
                    item_key: "example".to_string(),
                    tenant: None,
                    query_terms: vec![],
                    max_candidates: None,
                    write_to_pool: true,
                    auto_ingest: true,
                })
                .await
                .unwrap();

            assert_eq!(report.candidates.len(), 1);
            assert_eq!(report.pool_writes.unwrap().inserted, 1);
            assert_eq!(report.ingest.unwrap().inserted, 1);

            // Second run: the pool write is a duplicate, not an error.
            let report = service
                .run(&UnifiedSearchRequest {
                    item_key: "example".to_string(),
                    tenant: None,
                    query_terms: vec![],
                    max_candidates: None,
                    write_to_pool: true,
                    auto_ingest: false,
                })
                .await
                .unwrap();
            assert_eq!(report.pool_writes.unwrap().duplicates, 1);
        }

        #[tokio::test]
        async fn test_unknown_item_is_not_found() {
            let service = UnifiedSearchService::new(
                Arc::new(MemoryStore::new()),
                Arc::new(FixedResolver { binding: None }),
                None,
                UnifiedSearch::new(MapFetcher::new(&[]), SearchConfig::default()),
            );
            let err = service
                .run(&UnifiedSearchRequest {
                    item_key: "nope".to_string(),
                    tenant: None,
                    query_terms: vec![],
                    max_candidates: None,
                    write_to_pool: false,
                    auto_ingest: false,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, PoolError::NotFound { .. }));
        }
    }
}
