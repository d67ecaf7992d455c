//! LLM-assisted classification fallback.
//!
//! The model is consulted only for URLs the rule engine leaves unresolved,
//! and its output is never trusted as-is: every field is re-validated
//! against the closed enums and the template invariants before use. A
//! response that fails validation is silently replaced by the deterministic
//! fallback — a model outage or a malformed answer can degrade precision,
//! never correctness.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::classify::{Classifier, ClassifyRequest, RuleClassifier};
use crate::error::Result;
use crate::normalize::domain_of;
use crate::traits::ChatCompleter;
use crate::types::entry::{Capabilities, EntryType, PAGE_PLACEHOLDER, QUERY_PLACEHOLDER};
use crate::types::{ChannelKey, Recommendation, RecommendationSource};

/// URLs per batched model call, index-addressed.
pub const BATCH_GROUP_SIZE: usize = 8;

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static pattern"))
}

/// Raw model output for one URL, before validation.
#[derive(Debug, Deserialize)]
struct RawRecommendation {
    entry_type: String,
    channel_key: String,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    symbol_suggestion: Option<String>,
}

/// Row of a batched response.
#[derive(Debug, Deserialize)]
struct RawBatchRow {
    index: usize,
    #[serde(flatten)]
    recommendation: RawRecommendation,
}

/// Rule engine first, validated model fallback second.
pub struct LlmClassifier<C> {
    completer: C,
    rules: RuleClassifier,
    group_size: usize,
}

impl<C: ChatCompleter> LlmClassifier<C> {
    pub fn new(completer: C) -> Self {
        Self {
            completer,
            rules: RuleClassifier::new(),
            group_size: BATCH_GROUP_SIZE,
        }
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.max(1);
        self
    }

    async fn classify_one_with_model(&self, site_url: &str) -> Result<Option<Recommendation>> {
        let prompt = single_prompt(site_url);
        let response = self.completer.complete(&prompt).await?;
        let json = extract_json(&response);
        let raw: RawRecommendation = serde_json::from_str(json)?;
        Ok(validate(site_url, raw))
    }

    async fn classify_group_with_model(
        &self,
        unresolved: &[(usize, &ClassifyRequest)],
    ) -> Result<Vec<(usize, Recommendation)>> {
        let prompt = batch_prompt(unresolved);
        let response = self.completer.complete(&prompt).await?;
        let json = extract_json(&response);
        let rows: Vec<RawBatchRow> = serde_json::from_str(json)?;

        let mut out = Vec::new();
        for row in rows {
            // Index addressing: rows the model invented are dropped here.
            let Some((original_index, request)) =
                unresolved.iter().find(|(i, _)| *i == row.index)
            else {
                continue;
            };
            if let Some(rec) = validate(&request.site_url, row.recommendation) {
                out.push((*original_index, rec));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<C: ChatCompleter> Classifier for LlmClassifier<C> {
    async fn classify(&self, request: &ClassifyRequest) -> Recommendation {
        let rec = self.rules.evaluate(request);
        if rec.source != RecommendationSource::Fallback {
            return rec;
        }

        match self.classify_one_with_model(&request.site_url).await {
            Ok(Some(validated)) => validated,
            Ok(None) => {
                debug!(url = %request.site_url, "model recommendation rejected by validation");
                rec
            }
            Err(e) => {
                warn!(url = %request.site_url, error = %e, "model classification failed");
                rec
            }
        }
    }

    /// Partition unresolved rows into fixed-size groups, one model call per
    /// group. A row absent from or invalid in the response keeps its rule
    /// result; a failed group never fails the batch.
    async fn classify_batch(&self, requests: &[ClassifyRequest]) -> Vec<Recommendation> {
        let mut results: Vec<Recommendation> = requests
            .iter()
            .map(|request| self.rules.evaluate(request))
            .collect();

        let unresolved: Vec<(usize, &ClassifyRequest)> = results
            .iter()
            .enumerate()
            .filter(|(_, rec)| rec.source == RecommendationSource::Fallback)
            .map(|(i, _)| (i, &requests[i]))
            .collect();

        for group in unresolved.chunks(self.group_size) {
            match self.classify_group_with_model(group).await {
                Ok(validated) => {
                    for (index, rec) in validated {
                        results[index] = rec;
                    }
                }
                Err(e) => {
                    warn!(group_len = group.len(), error = %e, "batched model classification failed");
                }
            }
        }

        results
    }
}

/// Validate raw model output into a trusted recommendation.
///
/// Any violation discards the entire recommendation; the caller falls back
/// to the deterministic path. Only `symbol_suggestion` degrades softly — a
/// malformed suggestion is dropped, not fatal.
fn validate(site_url: &str, raw: RawRecommendation) -> Option<Recommendation> {
    let entry_type = EntryType::parse(&raw.entry_type)?;
    let channel_key = ChannelKey::parse(&raw.channel_key)?;

    let template = match entry_type {
        EntryType::SearchTemplate => {
            let template = raw.template?;
            if !template.contains(QUERY_PLACEHOLDER) {
                return None;
            }
            let probe = template
                .replace(QUERY_PLACEHOLDER, "x")
                .replace(PAGE_PLACEHOLDER, "1");
            if domain_of(&probe)? != domain_of(site_url)? {
                return None;
            }
            Some(template)
        }
        _ => None,
    };

    let symbol_suggestion = raw
        .symbol_suggestion
        .filter(|s| symbol_pattern().is_match(s));

    Some(Recommendation {
        entry_type,
        channel_key,
        template,
        validated: true,
        source: RecommendationSource::Llm,
        capabilities: Capabilities::for_entry_type(entry_type),
        symbol_suggestion,
    })
}

/// Strip code fences and surrounding prose from a model response.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    let start = trimmed
        .find(['{', '['])
        .unwrap_or(0);
    let end = trimmed
        .rfind(['}', ']'])
        .map(|i| i + 1)
        .unwrap_or(trimmed.len());
    trimmed.get(start..end).unwrap_or(trimmed)
}

fn single_prompt(site_url: &str) -> String {
    format!(
        "You classify website endpoints into a fixed taxonomy.\n\
         Entry types: domain_root, sitemap, rss, search_template, official_api.\n\
         Channel keys: url_pool, rss, sitemap, search_template, official_api.\n\
         For search_template, `template` must be a URL on the same host \
         containing the literal placeholder {QUERY_PLACEHOLDER}.\n\n\
         URL: {site_url}\n\n\
         Respond with a single JSON object, no prose:\n\
         {{\"entry_type\": \"...\", \"channel_key\": \"...\", \
         \"template\": \"...\", \"symbol_suggestion\": \"...\"}}\n\
         Omit `template` and `symbol_suggestion` when not applicable."
    )
}

fn batch_prompt(unresolved: &[(usize, &ClassifyRequest)]) -> String {
    let mut lines = String::new();
    for (index, request) in unresolved {
        lines.push_str(&format!("{index}: {}\n", request.site_url));
    }
    format!(
        "You classify website endpoints into a fixed taxonomy.\n\
         Entry types: domain_root, sitemap, rss, search_template, official_api.\n\
         Channel keys: url_pool, rss, sitemap, search_template, official_api.\n\
         For search_template, `template` must be a URL on the same host \
         containing the literal placeholder {QUERY_PLACEHOLDER}.\n\n\
         URLs (index: url):\n{lines}\n\
         Respond with a JSON array, one object per input line, no prose:\n\
         [{{\"index\": 0, \"entry_type\": \"...\", \"channel_key\": \"...\", \
         \"template\": \"...\", \"symbol_suggestion\": \"...\"}}]\n\
         Omit `template` and `symbol_suggestion` when not applicable."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use std::sync::Mutex;

    /// Completer returning canned responses in order.
    struct ScriptedCompleter {
        responses: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedCompleter {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ChatCompleter for ScriptedCompleter {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(PoolError::Completion("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    #[tokio::test]
    async fn test_rule_match_skips_model() {
        // A scripted error would surface if the model were consulted.
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Err(
            PoolError::Completion("should not be called".into()),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/sitemap.xml"))
            .await;
        assert_eq!(rec.entry_type, EntryType::Sitemap);
        assert_eq!(rec.source, RecommendationSource::Rule);
    }

    #[tokio::test]
    async fn test_valid_model_response_accepted() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(
            r#"```json
            {"entry_type": "official_api", "channel_key": "official_api", "symbol_suggestion": "acme_api"}
            ```"#
                .to_string(),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://api.example.com/v1"))
            .await;
        assert_eq!(rec.entry_type, EntryType::OfficialApi);
        assert_eq!(rec.source, RecommendationSource::Llm);
        assert!(rec.validated);
        assert_eq!(rec.symbol_suggestion.as_deref(), Some("acme_api"));
    }

    #[tokio::test]
    async fn test_cross_host_template_rejected() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(
            r#"{"entry_type": "search_template", "channel_key": "search_template",
                "template": "https://evil.com/search?q={{query}}"}"#
                .to_string(),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/page"))
            .await;
        // Whole recommendation discarded, deterministic fallback used.
        assert_eq!(rec.entry_type, EntryType::DomainRoot);
        assert_eq!(rec.source, RecommendationSource::Fallback);
        assert!(!rec.validated);
    }

    #[tokio::test]
    async fn test_template_without_placeholder_rejected() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(
            r#"{"entry_type": "search_template", "channel_key": "search_template",
                "template": "https://example.com/search?q=fixed"}"#
                .to_string(),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/page"))
            .await;
        assert_eq!(rec.source, RecommendationSource::Fallback);
    }

    #[tokio::test]
    async fn test_unknown_enum_values_rejected() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(
            r#"{"entry_type": "podcast", "channel_key": "url_pool"}"#.to_string(),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/page"))
            .await;
        assert_eq!(rec.source, RecommendationSource::Fallback);
    }

    #[tokio::test]
    async fn test_malformed_symbol_suggestion_dropped_not_fatal() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(
            r#"{"entry_type": "rss", "channel_key": "rss", "symbol_suggestion": "Not Valid!"}"#
                .to_string(),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/page"))
            .await;
        assert_eq!(rec.entry_type, EntryType::Rss);
        assert_eq!(rec.symbol_suggestion, None);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Err(
            PoolError::Completion("connection refused".into()),
        )]));
        let rec = classifier
            .classify(&ClassifyRequest::new("https://example.com/page"))
            .await;
        assert_eq!(rec.source, RecommendationSource::Fallback);
    }

    #[tokio::test]
    async fn test_batch_partial_response_falls_back_per_row() {
        // Three unresolved URLs; the model answers for index 0 and 2 only.
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Ok(r#"[
                {"index": 0, "entry_type": "official_api", "channel_key": "official_api"},
                {"index": 2, "entry_type": "rss", "channel_key": "rss"}
            ]"#
        .to_string())]));
        let requests = vec![
            ClassifyRequest::new("https://a.example.com/x"),
            ClassifyRequest::new("https://b.example.com/y"),
            ClassifyRequest::new("https://c.example.com/z"),
        ];
        let recs = classifier.classify_batch(&requests).await;
        assert_eq!(recs[0].entry_type, EntryType::OfficialApi);
        assert_eq!(recs[1].source, RecommendationSource::Fallback);
        assert_eq!(recs[2].entry_type, EntryType::Rss);
    }

    #[tokio::test]
    async fn test_batch_model_failure_never_fails_batch() {
        let classifier = LlmClassifier::new(ScriptedCompleter::new(vec![Err(
            PoolError::Completion("quota exceeded".into()),
        )]));
        let requests = vec![
            ClassifyRequest::new("https://example.com/feed"),
            ClassifyRequest::new("https://example.com/about"),
        ];
        let recs = classifier.classify_batch(&requests).await;
        // Rule-resolved row untouched, unresolved row stays fallback.
        assert_eq!(recs[0].entry_type, EntryType::Rss);
        assert_eq!(recs[1].source, RecommendationSource::Fallback);
    }
}
