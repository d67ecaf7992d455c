//! Document ingestion seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Counters returned by the ingestion collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Hands discovered candidate URLs to the document pipeline.
///
/// Invoked only when a unified search requests `auto_ingest`; the pipeline
/// itself is outside this subsystem.
#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    async fn ingest(&self, urls: &[String], tenant: Option<&str>) -> Result<IngestStats>;
}
