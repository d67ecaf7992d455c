//! Raw pool URLs: unclassified URLs retained for later discovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which collection flow produced a URL or entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlSource {
    Discovery,
    Document,
    Task,
    Manual,
    UnifiedSearch,
}

impl UrlSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlSource::Discovery => "discovery",
            UrlSource::Document => "document",
            UrlSource::Task => "task",
            UrlSource::Manual => "manual",
            UrlSource::UnifiedSearch => "unified_search",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "discovery" => Some(UrlSource::Discovery),
            "document" => Some(UrlSource::Document),
            "task" => Some(UrlSource::Task),
            "manual" => Some(UrlSource::Manual),
            "unified_search" => Some(UrlSource::UnifiedSearch),
            _ => None,
        }
    }
}

/// A raw URL observed from some collection flow.
///
/// `url` is normalized and unique within its scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolUrl {
    pub url: String,
    pub domain: String,
    pub source: UrlSource,
    #[serde(default)]
    pub source_ref: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a URL to the pool. Normalization happens in the
/// store boundary so every writer goes through the same canonical form.
#[derive(Debug, Clone)]
pub struct NewPoolUrl {
    pub url: String,
    pub source: UrlSource,
    pub source_ref: serde_json::Value,
}

impl NewPoolUrl {
    pub fn new(url: impl Into<String>, source: UrlSource) -> Self {
        Self {
            url: url.into(),
            source,
            source_ref: serde_json::Value::Null,
        }
    }

    pub fn with_source_ref(mut self, source_ref: serde_json::Value) -> Self {
        self.source_ref = source_ref;
        self
    }
}

/// Per-row upsert report. A duplicate is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    Inserted,
    Duplicate,
}

/// Aggregate counts for a bulk append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendStats {
    pub inserted: usize,
    pub duplicates: usize,
    /// Rows skipped because the URL did not normalize.
    pub invalid: usize,
}

impl AppendStats {
    pub fn record(&mut self, outcome: AppendOutcome) {
        match outcome {
            AppendOutcome::Inserted => self.inserted += 1,
            AppendOutcome::Duplicate => self.duplicates += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.invalid
    }
}
