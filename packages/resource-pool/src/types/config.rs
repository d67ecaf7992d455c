//! Tunables for discovery, unified search, and capture.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::scope::Scope;

/// Hard ceiling on fan-out workers, to bound load on third-party hosts.
pub const MAX_WORKERS: usize = 16;

/// Knobs for a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Concurrent domains probed at once.
    pub concurrency: usize,
    /// Per-probe timeout.
    pub probe_timeout: Duration,
    /// Fetch the home page once per domain and scan its markup for feed
    /// links and GET search forms.
    pub scan_home_page: bool,
    /// Domains per persisted chunk in the batch driver.
    pub batch_size: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            probe_timeout: Duration::from_secs(10),
            scan_home_page: true,
            batch_size: 10,
        }
    }
}

impl DiscoveryConfig {
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_WORKERS)
    }
}

/// Knobs for a unified search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Concurrent bound entries fetched at once.
    pub concurrency: usize,
    /// Cap on the merged candidate list.
    pub max_candidates: usize,
    /// Candidates kept when strict term filtering matches nothing.
    pub fallback_keep: usize,
    /// Sitemap index recursion depth.
    pub sitemap_max_depth: usize,
    /// Total sitemap documents fetched per entry, across all levels.
    pub sitemap_fetch_budget: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 6,
            max_candidates: 100,
            fallback_keep: 10,
            sitemap_max_depth: 3,
            sitemap_fetch_budget: 25,
        }
    }
}

impl SearchConfig {
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_WORKERS)
    }
}

/// Per-tenant gate for incidental URL capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub tenant: String,
    /// Job-type tags eligible for capture.
    pub job_types: HashSet<String>,
    /// Scope captured URLs are written to.
    pub scope: Scope,
    pub enabled: bool,
}

impl CaptureConfig {
    pub fn allows(&self, job_type: &str) -> bool {
        self.enabled && self.job_types.contains(job_type)
    }
}
