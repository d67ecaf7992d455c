//! Site entries: classified, queryable endpoints for one domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{domain_of, normalize};
use crate::types::pool::UrlSource;

/// Literal query placeholder in search templates.
pub const QUERY_PLACEHOLDER: &str = "{{query}}";

/// Literal page-number placeholder in search templates.
pub const PAGE_PLACEHOLDER: &str = "{{page}}";

/// The closed taxonomy of endpoint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    DomainRoot,
    Sitemap,
    Rss,
    SearchTemplate,
    OfficialApi,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::DomainRoot => "domain_root",
            EntryType::Sitemap => "sitemap",
            EntryType::Rss => "rss",
            EntryType::SearchTemplate => "search_template",
            EntryType::OfficialApi => "official_api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "domain_root" => Some(EntryType::DomainRoot),
            "sitemap" => Some(EntryType::Sitemap),
            "rss" => Some(EntryType::Rss),
            "search_template" => Some(EntryType::SearchTemplate),
            "official_api" => Some(EntryType::OfficialApi),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How query terms are applied to an entry's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    /// Entry does not react to query terms.
    None,
    /// Entry returns everything; results are filtered by term afterwards.
    Filter,
    /// Entry takes the terms in the request itself.
    Search,
}

/// Derived capability flags. Pure function of [`EntryType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_query_terms: bool,
    pub keyword_mode: KeywordMode,
}

impl Capabilities {
    pub fn for_entry_type(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::SearchTemplate => Capabilities {
                supports_query_terms: true,
                keyword_mode: KeywordMode::Search,
            },
            EntryType::Rss | EntryType::Sitemap => Capabilities {
                supports_query_terms: true,
                keyword_mode: KeywordMode::Filter,
            },
            EntryType::DomainRoot | EntryType::OfficialApi => Capabilities {
                supports_query_terms: false,
                keyword_mode: KeywordMode::None,
            },
        }
    }
}

/// A classified, queryable endpoint for one domain.
///
/// `site_url` is the entry's own identity (e.g. a sitemap or search-page
/// URL), normalized and unique within its scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteEntry {
    pub site_url: String,
    pub domain: String,
    pub entry_type: EntryType,
    /// Required and validated only when `entry_type` is `SearchTemplate`.
    pub template: Option<String>,
    pub capabilities: Capabilities,
    pub source: UrlSource,
    #[serde(default)]
    pub source_ref: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    pub enabled: bool,
    /// Classification provenance: recommended channel, confidence source.
    #[serde(default)]
    pub extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a site entry.
#[derive(Debug, Clone)]
pub struct NewSiteEntry {
    pub site_url: String,
    pub entry_type: EntryType,
    pub template: Option<String>,
    pub source: UrlSource,
    pub source_ref: serde_json::Value,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub extra: serde_json::Value,
}

impl NewSiteEntry {
    pub fn new(site_url: impl Into<String>, entry_type: EntryType, source: UrlSource) -> Self {
        Self {
            site_url: site_url.into(),
            entry_type,
            template: None,
            source,
            source_ref: serde_json::Value::Null,
            tags: Vec::new(),
            enabled: true,
            extra: serde_json::Value::Null,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }

    /// Normalize and validate into a persistable [`SiteEntry`].
    ///
    /// Enforces the invariants of the data model: the identity URL must
    /// normalize, and a search template must carry the query placeholder and
    /// point at the entry's own domain.
    pub fn into_entry(self) -> Result<SiteEntry, String> {
        let site_url =
            normalize(&self.site_url).ok_or_else(|| format!("unnormalizable URL: {}", self.site_url))?;
        let domain = domain_of(&site_url).ok_or_else(|| format!("no host in URL: {site_url}"))?;

        let template = match (self.entry_type, self.template) {
            (EntryType::SearchTemplate, Some(t)) => {
                if !t.contains(QUERY_PLACEHOLDER) {
                    return Err(format!("template missing {QUERY_PLACEHOLDER}: {t}"));
                }
                match domain_of(&t.replace(QUERY_PLACEHOLDER, "x").replace(PAGE_PLACEHOLDER, "1")) {
                    Some(d) if d == domain => {}
                    _ => return Err(format!("template host does not match {domain}: {t}")),
                }
                Some(t)
            }
            (EntryType::SearchTemplate, None) => {
                return Err("search_template entry requires a template".to_string())
            }
            // Templates are meaningless on other entry types.
            (_, _) => None,
        };

        Ok(SiteEntry {
            site_url,
            domain,
            entry_type: self.entry_type,
            template,
            capabilities: Capabilities::for_entry_type(self.entry_type),
            source: self.source,
            source_ref: self.source_ref,
            tags: self.tags,
            enabled: self.enabled,
            extra: self.extra,
            created_at: Utc::now(),
        })
    }
}
