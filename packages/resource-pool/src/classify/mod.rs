//! Classification engine: candidate endpoint URL → validated recommendation.
//!
//! Two implementations compose into a fallback chain: [`RuleClassifier`]
//! resolves everything it can deterministically, and [`LlmClassifier`]
//! consults a chat model only for URLs the rules leave unresolved — and
//! validates the model's output before trusting a single field of it.

mod llm;
mod rules;

pub use llm::{LlmClassifier, BATCH_GROUP_SIZE};
pub use rules::RuleClassifier;

use async_trait::async_trait;

use crate::types::Recommendation;

/// One classification request.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub site_url: String,
    /// Free-form entry-type hint from the caller (e.g. prior metadata).
    pub entry_type_hint: Option<String>,
    /// Template hint, honored only with a `search_template` hint.
    pub template_hint: Option<String>,
}

impl ClassifyRequest {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            entry_type_hint: None,
            template_hint: None,
        }
    }

    pub fn with_hint(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type_hint = Some(entry_type.into());
        self
    }

    pub fn with_template_hint(mut self, template: impl Into<String>) -> Self {
        self.template_hint = Some(template.into());
        self
    }
}

/// Maps a candidate endpoint to a recommendation.
///
/// Classification never fails: an undeterminable URL yields the
/// deterministic fallback (`domain_root` / `url_pool`, unvalidated).
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassifyRequest) -> Recommendation;

    /// Classify many requests. Implementations may batch; the default is
    /// sequential.
    async fn classify_batch(&self, requests: &[ClassifyRequest]) -> Vec<Recommendation> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.classify(request).await);
        }
        out
    }
}
