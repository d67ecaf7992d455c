//! HTTP forwarder to the document-ingestion collaborator.

use async_trait::async_trait;
use resource_pool::error::{PoolError, Result};
use resource_pool::{DocumentIngestor, IngestStats};
use serde_json::json;
use tracing::info;

/// Posts candidate URLs to an external ingestion endpoint.
pub struct HttpIngestor {
    client: reqwest::Client,
    url: String,
}

impl HttpIngestor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl DocumentIngestor for HttpIngestor {
    async fn ingest(&self, urls: &[String], tenant: Option<&str>) -> Result<IngestStats> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "urls": urls, "tenant": tenant }))
            .send()
            .await
            .map_err(|e| PoolError::Storage(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoolError::Storage(
                format!("ingestion endpoint returned {status}").into(),
            ));
        }

        let stats: IngestStats = response
            .json()
            .await
            .map_err(|e| PoolError::Storage(Box::new(e)))?;
        info!(
            urls = urls.len(),
            inserted = stats.inserted,
            updated = stats.updated,
            skipped = stats.skipped,
            "ingestion hand-off complete"
        );
        Ok(stats)
    }
}
