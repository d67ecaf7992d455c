//! Capture gate: whether incidentally observed URLs enter the pool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::traits::PoolStore;
use crate::types::{AppendOutcome, NewPoolUrl, UrlSource};

/// What the gate decided for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// No config for the tenant, or capture disabled.
    Disabled,
    /// The job type is not in the tenant's eligible set.
    JobTypeExcluded,
    /// URL did not normalize; nothing written.
    Invalid,
    Appended(AppendOutcome),
}

/// Pure gate in front of the pool: looks up the tenant's capture config and
/// either no-ops or performs a single store write at the configured scope.
/// No retries, no other side effects.
pub struct CaptureGate {
    store: Arc<dyn PoolStore>,
}

impl CaptureGate {
    pub fn new(store: Arc<dyn PoolStore>) -> Self {
        Self { store }
    }

    pub async fn capture(
        &self,
        url: &str,
        source: UrlSource,
        source_ref: serde_json::Value,
        tenant: &str,
        job_type: &str,
    ) -> Result<CaptureOutcome> {
        let Some(config) = self.store.get_capture_config(tenant).await? else {
            return Ok(CaptureOutcome::Disabled);
        };
        if !config.enabled {
            return Ok(CaptureOutcome::Disabled);
        }
        if !config.allows(job_type) {
            return Ok(CaptureOutcome::JobTypeExcluded);
        }
        if crate::normalize::normalize(url).is_none() {
            return Ok(CaptureOutcome::Invalid);
        }

        let outcome = self
            .store
            .append_url(
                &config.scope,
                NewPoolUrl::new(url, source).with_source_ref(source_ref),
            )
            .await?;
        debug!(url, tenant, job_type, outcome = ?outcome, "captured URL");
        Ok(CaptureOutcome::Appended(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::types::{CaptureConfig, Scope};
    use std::collections::HashSet;

    async fn gate_with_config(config: Option<CaptureConfig>) -> CaptureGate {
        let store = Arc::new(MemoryStore::new());
        if let Some(config) = config {
            store.upsert_capture_config(config).await.unwrap();
        }
        CaptureGate::new(store)
    }

    fn config(enabled: bool, job_types: &[&str]) -> CaptureConfig {
        CaptureConfig {
            tenant: "acme".to_string(),
            job_types: job_types.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            scope: Scope::Project {
                tenant: "acme".to_string(),
            },
            enabled,
        }
    }

    #[tokio::test]
    async fn test_no_config_is_disabled() {
        let gate = gate_with_config(None).await;
        let outcome = gate
            .capture(
                "https://example.com/doc",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "crawl",
            )
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_disabled_config_no_ops() {
        let gate = gate_with_config(Some(config(false, &["crawl"]))).await;
        let outcome = gate
            .capture(
                "https://example.com/doc",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "crawl",
            )
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_job_type_gate() {
        let gate = gate_with_config(Some(config(true, &["crawl"]))).await;
        let outcome = gate
            .capture(
                "https://example.com/doc",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "export",
            )
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::JobTypeExcluded);
    }

    #[tokio::test]
    async fn test_eligible_job_appends_once() {
        let gate = gate_with_config(Some(config(true, &["crawl"]))).await;
        let first = gate
            .capture(
                "https://example.com/doc",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "crawl",
            )
            .await
            .unwrap();
        assert_eq!(first, CaptureOutcome::Appended(AppendOutcome::Inserted));

        let second = gate
            .capture(
                "https://example.com/doc#frag",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "crawl",
            )
            .await
            .unwrap();
        // Same normalized URL: duplicate, not an error.
        assert_eq!(second, CaptureOutcome::Appended(AppendOutcome::Duplicate));
    }

    #[tokio::test]
    async fn test_unnormalizable_url_is_invalid() {
        let gate = gate_with_config(Some(config(true, &["crawl"]))).await;
        let outcome = gate
            .capture(
                "not a url",
                UrlSource::Task,
                serde_json::Value::Null,
                "acme",
                "crawl",
            )
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Invalid);
    }
}
