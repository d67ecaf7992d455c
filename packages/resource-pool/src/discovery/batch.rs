//! Chunked discovery driver: scan, classify, persist, report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::classify::{Classifier, ClassifyRequest};
use crate::discovery::{merge_candidates, Candidate, DiscoveryProber};
use crate::error::Result;
use crate::traits::{EntryFilter, Page, PageFetcher, PoolStore};
use crate::types::{AppendStats, NewSiteEntry, Scope, UrlSource};

/// Flag checked at chunk boundaries; setting it stops a long scan at the
/// next checkpoint with partial results persisted.
pub type CancelFlag = Arc<AtomicBool>;

/// A discovery run over a domain set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Domains to scan; when empty, the pool's distinct domains are used.
    #[serde(default)]
    pub domains: Vec<String>,
    /// When non-empty, only these domains are scanned.
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    /// Skip domains that already have site entries at the target scope.
    #[serde(default)]
    pub skip_known: bool,
    pub scope: Scope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainError {
    pub domain: String,
    pub error: String,
}

/// Cumulative progress, reported after every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryProgress {
    pub domains_total: usize,
    pub domains_scanned: usize,
    pub candidates_found: usize,
    pub entries_written: AppendStats,
    pub errors: Vec<DomainError>,
    pub cancelled: bool,
    pub finished: bool,
}

/// Processes domains in fixed-size chunks, persisting discovered entries
/// incrementally so long runs can be inspected and cancelled midway.
pub struct BatchDiscoveryDriver<S: ?Sized, F, C: ?Sized> {
    store: Arc<S>,
    prober: DiscoveryProber<F>,
    classifier: Arc<C>,
    batch_size: usize,
}

impl<S, F, C> BatchDiscoveryDriver<S, F, C>
where
    S: PoolStore + ?Sized,
    F: PageFetcher + 'static,
    C: Classifier + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        prober: DiscoveryProber<F>,
        classifier: Arc<C>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            prober,
            classifier,
            batch_size: batch_size.max(1),
        }
    }

    /// Run discovery to completion (or cancellation), invoking `on_chunk`
    /// with cumulative progress after every persisted chunk.
    pub async fn run(
        &self,
        request: &DiscoveryRequest,
        cancel: Option<CancelFlag>,
        mut on_chunk: impl FnMut(&DiscoveryProgress) + Send,
    ) -> Result<DiscoveryProgress> {
        let domains = self.resolve_domains(request).await?;
        let mut progress = DiscoveryProgress {
            domains_total: domains.len(),
            ..Default::default()
        };
        info!(domains = domains.len(), scope = %request.scope, "starting discovery run");

        for chunk in domains.chunks(self.batch_size) {
            if cancel
                .as_ref()
                .map(|flag| flag.load(Ordering::Relaxed))
                .unwrap_or(false)
            {
                progress.cancelled = true;
                break;
            }

            let scans = self.prober.scan_domains(chunk).await;
            let candidates = merge_candidates(&scans);

            progress.domains_scanned += chunk.len();
            progress.candidates_found += candidates.len();
            for scan in &scans {
                if let Some(error) = &scan.error {
                    progress.errors.push(DomainError {
                        domain: scan.domain.clone(),
                        error: error.clone(),
                    });
                }
            }

            self.persist_candidates(&request.scope, candidates, &mut progress)
                .await?;
            on_chunk(&progress);
        }

        progress.finished = !progress.cancelled;
        info!(
            scanned = progress.domains_scanned,
            candidates = progress.candidates_found,
            written = progress.entries_written.inserted,
            errors = progress.errors.len(),
            cancelled = progress.cancelled,
            "discovery run complete"
        );
        Ok(progress)
    }

    async fn resolve_domains(&self, request: &DiscoveryRequest) -> Result<Vec<String>> {
        let mut domains = if request.domains.is_empty() {
            self.store.list_domains(&request.scope).await?
        } else {
            request.domains.clone()
        };

        domains.retain(|d| !d.trim().is_empty());
        domains.sort();
        domains.dedup();

        if !request.allow.is_empty() {
            domains.retain(|d| request.allow.iter().any(|a| a == d));
        }
        domains.retain(|d| !request.deny.iter().any(|x| x == d));

        if request.skip_known {
            let mut unknown = Vec::with_capacity(domains.len());
            for domain in domains {
                let filter = EntryFilter {
                    domain: Some(domain.clone()),
                    ..Default::default()
                };
                let (_, total) = self
                    .store
                    .list_site_entries(&request.scope, &filter, &Page::new(1, 1))
                    .await?;
                if total == 0 {
                    unknown.push(domain);
                }
            }
            domains = unknown;
        }

        Ok(domains)
    }

    async fn persist_candidates(
        &self,
        scope: &Scope,
        candidates: Vec<Candidate>,
        progress: &mut DiscoveryProgress,
    ) -> Result<()> {
        for candidate in candidates {
            let mut classify_request =
                ClassifyRequest::new(&candidate.site_url).with_hint(candidate.entry_type.as_str());
            if let Some(template) = &candidate.template {
                classify_request = classify_request.with_template_hint(template);
            }
            let recommendation = self.classifier.classify(&classify_request).await;

            let mut new_entry = NewSiteEntry::new(
                &candidate.site_url,
                recommendation.entry_type,
                UrlSource::Discovery,
            )
            .with_extra(json!({
                "recommended_channel": recommendation.channel_key.as_str(),
                "confidence_source": recommendation.source,
                "via": candidate.via,
            }));
            new_entry.template = recommendation.template.clone();

            let entry = match new_entry.into_entry() {
                Ok(entry) => entry,
                Err(reason) => {
                    warn!(url = %candidate.site_url, %reason, "dropping invalid candidate");
                    continue;
                }
            };

            let outcome = self.store.upsert_site_entry(scope, entry).await?;
            progress.entries_written.record(outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RuleClassifier;
    use crate::stores::MemoryStore;
    use crate::types::{DiscoveryConfig, EntryType};

    use crate::error::{FetchError, FetchResult};
    use crate::traits::FetchedPage;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapFetcher {
        pages: HashMap<String, String>,
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

    fn driver(
        pages: HashMap<String, String>,
        store: Arc<MemoryStore>,
    ) -> BatchDiscoveryDriver<MemoryStore, MapFetcher, RuleClassifier> {
        let prober = DiscoveryProber::new(
            Arc::new(MapFetcher { pages }),
            DiscoveryConfig {
                batch_size: 2,
                ..Default::default()
            },
        );
        BatchDiscoveryDriver::new(store, prober, Arc::new(RuleClassifier::new()), 2)
    }

    #[tokio::test]
    async fn test_run_persists_and_reports_per_chunk() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://a.com/sitemap.xml".to_string(),
            "<urlset/>".to_string(),
        );
        pages.insert("https://a.com/".to_string(), "<html></html>".to_string());
        pages.insert("https://b.com/".to_string(), "<html></html>".to_string());
        pages.insert("https://c.com/".to_string(), "<html></html>".to_string());

        let store = Arc::new(MemoryStore::new());
        let driver = driver(pages, store.clone());

        let request = DiscoveryRequest {
            domains: vec!["a.com".into(), "b.com".into(), "c.com".into()],
            allow: vec![],
            deny: vec![],
            skip_known: false,
            scope: Scope::Shared,
        };

        let mut chunk_reports = 0;
        let progress = driver
            .run(&request, None, |_| chunk_reports += 1)
            .await
            .unwrap();

        // 3 domains, chunk size 2 → two checkpoints.
        assert_eq!(chunk_reports, 2);
        assert!(progress.finished);
        assert_eq!(progress.domains_scanned, 3);
        // Every domain contributes a root entry; a.com adds its sitemap.
        assert_eq!(progress.entries_written.inserted, 4);

        let entry = store
            .get_site_entry(&Scope::Shared, "https://a.com/sitemap.xml")
            .await
            .unwrap()
            .expect("sitemap entry persisted");
        assert_eq!(entry.entry_type, EntryType::Sitemap);
    }

    #[tokio::test]
    async fn test_deny_list_and_cancellation() {
        let store = Arc::new(MemoryStore::new());
        let driver = driver(HashMap::new(), store.clone());

        let request = DiscoveryRequest {
            domains: vec!["a.com".into(), "b.com".into()],
            allow: vec![],
            deny: vec!["b.com".into()],
            skip_known: false,
            scope: Scope::Shared,
        };

        let cancel: CancelFlag = Arc::new(AtomicBool::new(true));
        let progress = driver
            .run(&request, Some(cancel), |_| {})
            .await
            .unwrap();
        assert!(progress.cancelled);
        assert_eq!(progress.domains_scanned, 0);
        assert_eq!(progress.domains_total, 1);
    }

    #[tokio::test]
    async fn test_skip_known_filters_scanned_domains() {
        let store = Arc::new(MemoryStore::new());
        let entry = NewSiteEntry::new("https://a.com/", EntryType::DomainRoot, UrlSource::Manual)
            .into_entry()
            .unwrap();
        store
            .upsert_site_entry(&Scope::Shared, entry)
            .await
            .unwrap();

        let driver = driver(HashMap::new(), store.clone());
        let request = DiscoveryRequest {
            domains: vec!["a.com".into(), "b.com".into()],
            allow: vec![],
            deny: vec![],
            skip_known: true,
            scope: Scope::Shared,
        };
        let progress = driver.run(&request, None, |_| {}).await.unwrap();
        assert_eq!(progress.domains_total, 1);
        assert_eq!(progress.domains_scanned, 1);
    }
}
