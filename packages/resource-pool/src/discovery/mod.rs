//! Site-entry discovery: per-domain probing of well-known endpoints.
//!
//! For each domain the prober emits a `domain_root` candidate, probes fixed
//! ordered lists of sitemap, feed, and search paths (first success wins per
//! list), and optionally scans the home page markup for feed links and GET
//! search forms. Domains are scanned independently over a bounded worker
//! pool; each scan returns a self-contained [`DomainScan`] that the caller
//! merges — a failing domain never touches its siblings.

mod batch;
mod markup;

pub use batch::{BatchDiscoveryDriver, DiscoveryProgress, DiscoveryRequest, DomainError};
pub use markup::{extract_feed_links, extract_search_form};

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::normalize;
use crate::traits::PageFetcher;
use crate::types::entry::QUERY_PLACEHOLDER;
use crate::types::{DiscoveryConfig, EntryType};

/// Sitemap locations probed in order; the first success wins.
const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap-index.xml"];

/// Feed locations probed in order; the first success wins.
const FEED_PATHS: &[&str] = &["/rss", "/rss.xml", "/feed", "/feed.xml", "/atom.xml"];

/// Search pages probed in order; the first success wins.
const SEARCH_PATHS: &[&str] = &["/search", "/search/", "/find", "/query"];

/// How a candidate was found, retained as provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeVia {
    DomainRoot,
    WellKnownPath,
    LinkAlternate,
    SearchForm,
}

/// One discovered endpoint, before classification and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub site_url: String,
    pub entry_type: EntryType,
    pub template: Option<String>,
    pub via: ProbeVia,
}

/// Self-contained result of scanning one domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainScan {
    pub domain: String,
    pub candidates: Vec<Candidate>,
    pub probes_attempted: usize,
    /// Home-page fetch/parse failure. Probe misses are not errors.
    pub error: Option<String>,
}

/// Probes domains for site-entry candidates.
pub struct DiscoveryProber<F> {
    fetcher: Arc<F>,
    config: DiscoveryConfig,
}

impl<F: PageFetcher + 'static> DiscoveryProber<F> {
    pub fn new(fetcher: Arc<F>, config: DiscoveryConfig) -> Self {
        Self { fetcher, config }
    }

    /// Scan domains with bounded concurrency. Results come back in
    /// completion order; candidates across domains are merged by the caller
    /// (first occurrence wins).
    pub async fn scan_domains(&self, domains: &[String]) -> Vec<DomainScan> {
        stream::iter(domains.iter().cloned().map(|domain| {
            let fetcher = self.fetcher.clone();
            let config = self.config.clone();
            async move { scan_domain(fetcher, &domain, &config).await }
        }))
        .buffer_unordered(self.config.workers())
        .collect()
        .await
    }
}

/// Probe with the configured per-probe timeout; an elapsed timer counts as
/// a miss, same as any other probe failure.
async fn probe_with_timeout<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    config: &DiscoveryConfig,
) -> bool {
    tokio::time::timeout(config.probe_timeout, fetcher.probe(url))
        .await
        .unwrap_or(false)
}

async fn scan_domain<F: PageFetcher>(
    fetcher: Arc<F>,
    domain: &str,
    config: &DiscoveryConfig,
) -> DomainScan {
    let mut scan = DomainScan {
        domain: domain.to_string(),
        ..Default::default()
    };
    let root = format!("https://{domain}/");

    scan.candidates.push(Candidate {
        site_url: root.clone(),
        entry_type: EntryType::DomainRoot,
        template: None,
        via: ProbeVia::DomainRoot,
    });

    // Well-known paths: first success per list, then stop probing that list.
    for (paths, entry_type) in [
        (SITEMAP_PATHS, EntryType::Sitemap),
        (FEED_PATHS, EntryType::Rss),
    ] {
        for path in paths {
            let url = format!("https://{domain}{path}");
            scan.probes_attempted += 1;
            if probe_with_timeout(fetcher.as_ref(), &url, config).await {
                debug!(domain, url = %url, entry_type = %entry_type, "probe hit");
                push_candidate(
                    &mut scan.candidates,
                    Candidate {
                        site_url: url,
                        entry_type,
                        template: None,
                        via: ProbeVia::WellKnownPath,
                    },
                );
                break;
            }
        }
    }

    let mut have_search = false;
    for path in SEARCH_PATHS {
        let url = format!("https://{domain}{path}");
        scan.probes_attempted += 1;
        if probe_with_timeout(fetcher.as_ref(), &url, config).await {
            let Some(site_url) = normalize(&url) else {
                continue;
            };
            let template = format!("{site_url}?q={QUERY_PLACEHOLDER}");
            push_candidate(
                &mut scan.candidates,
                Candidate {
                    site_url,
                    entry_type: EntryType::SearchTemplate,
                    template: Some(template),
                    via: ProbeVia::WellKnownPath,
                },
            );
            have_search = true;
            break;
        }
    }

    if config.scan_home_page {
        match fetcher.fetch(&root).await {
            Ok(page) => {
                let html = page.text();
                let base = &page.final_url;

                for feed_url in markup::extract_feed_links(&html, base) {
                    push_candidate(
                        &mut scan.candidates,
                        Candidate {
                            site_url: feed_url,
                            entry_type: EntryType::Rss,
                            template: None,
                            via: ProbeVia::LinkAlternate,
                        },
                    );
                }

                if !have_search {
                    if let Some(template) = markup::extract_search_form(&html, base) {
                        let site_url = template
                            .split_once('?')
                            .map(|(base, _)| base.to_string())
                            .and_then(|u| normalize(&u));
                        if let Some(site_url) = site_url {
                            push_candidate(
                                &mut scan.candidates,
                                Candidate {
                                    site_url,
                                    entry_type: EntryType::SearchTemplate,
                                    template: Some(template),
                                    via: ProbeVia::SearchForm,
                                },
                            );
                        }
                    }
                }
            }
            Err(e) => {
                scan.error = Some(e.to_string());
            }
        }
    }

    scan
}

/// Insert keeping the first occurrence per site URL.
fn push_candidate(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if candidates
        .iter()
        .all(|c| c.site_url != candidate.site_url)
    {
        candidates.push(candidate);
    }
}

/// Merge scans into a deduplicated candidate list, first occurrence wins.
pub fn merge_candidates(scans: &[DomainScan]) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();
    for scan in scans {
        for candidate in &scan.candidates {
            push_candidate(&mut merged, candidate.clone());
        }
    }
    merged
}
