//! Deterministic rule engine. First match wins.

use async_trait::async_trait;
use url::Url;

use crate::classify::{Classifier, ClassifyRequest};
use crate::normalize::{domain_of, normalize};
use crate::types::entry::{EntryType, PAGE_PLACEHOLDER, QUERY_PLACEHOLDER};
use crate::types::Recommendation;

/// Query keys that mark a parametrized search page.
pub const SEARCH_QUERY_KEYS: &[&str] = &["q", "query", "keyword", "keywords", "search"];

/// Path fragments that mark a search page even without a query key.
const SEARCH_PATH_MARKERS: &[&str] = &["/search", "/find", "/query"];

/// Pagination-looking query keys, replaced with the page placeholder.
const PAGE_KEYS: &[&str] = &["page", "p", "paged"];

/// Rule-only classifier: hints, URL shape, nothing else.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core, shared by the async trait impl and the LLM chain.
    pub fn evaluate(&self, request: &ClassifyRequest) -> Recommendation {
        let Some(site_url) = normalize(&request.site_url) else {
            return Recommendation::fallback();
        };

        // 1. Known-hint mapping.
        if let Some(rec) = self.from_hint(&site_url, request) {
            return rec;
        }

        let Ok(url) = Url::parse(&site_url) else {
            return Recommendation::fallback();
        };
        let path = url.path().to_ascii_lowercase();

        // 2. Search shape: a recognized query key or a search-looking path.
        if let Some(template) = synthesize_template(&url) {
            return Recommendation::rule(EntryType::SearchTemplate, Some(template));
        }

        // 3. Sitemap.
        if path.contains("sitemap") {
            return Recommendation::rule(EntryType::Sitemap, None);
        }

        // 4. RSS / Atom.
        if path.ends_with(".xml")
            || path.contains("/feed")
            || path.contains("/rss")
            || path.contains("/atom")
        {
            return Recommendation::rule(EntryType::Rss, None);
        }

        // 6. Undetermined.
        Recommendation::fallback()
    }

    fn from_hint(&self, site_url: &str, request: &ClassifyRequest) -> Option<Recommendation> {
        let hint = EntryType::parse(request.entry_type_hint.as_deref()?)?;
        if hint != EntryType::SearchTemplate {
            return Some(Recommendation::rule(hint, None));
        }
        // A search_template hint is only usable with a valid template hint;
        // otherwise fall through to the shape rules.
        let template = request.template_hint.as_deref()?.trim();
        if template.is_empty() || !template.contains(QUERY_PLACEHOLDER) {
            return None;
        }
        let probe = template
            .replace(QUERY_PLACEHOLDER, "x")
            .replace(PAGE_PLACEHOLDER, "1");
        if domain_of(&probe)? != domain_of(site_url)? {
            return None;
        }
        Some(Recommendation::rule(
            EntryType::SearchTemplate,
            Some(template.to_string()),
        ))
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Recommendation {
        self.evaluate(request)
    }
}

/// Build a search template from a search-shaped URL, or `None` when the URL
/// has no search shape.
///
/// The matched query value is replaced with the literal query placeholder
/// and pagination-looking values with the page placeholder; placeholders are
/// spliced into the raw query string so they stay unencoded. A search-looking
/// path with no replaceable key gets a `q` placeholder appended instead.
fn synthesize_template(url: &Url) -> Option<String> {
    let path = url.path().to_ascii_lowercase();
    let path_is_search = SEARCH_PATH_MARKERS.iter().any(|m| path.contains(m));

    let mut replaced_query_key = false;
    let rewritten_query = url.query().map(|query| {
        query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, _value) = segment.split_once('=').unwrap_or((segment, ""));
                let key_lower = key.to_ascii_lowercase();
                if SEARCH_QUERY_KEYS.contains(&key_lower.as_str()) {
                    replaced_query_key = true;
                    format!("{key}={QUERY_PLACEHOLDER}")
                } else if PAGE_KEYS.contains(&key_lower.as_str()) {
                    format!("{key}={PAGE_PLACEHOLDER}")
                } else {
                    segment.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    });

    if replaced_query_key {
        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);
        return Some(format!("{}?{}", base, rewritten_query.unwrap_or_default()));
    }

    if path_is_search {
        // No replaceable key: append a placeholder query parameter.
        let mut base = url.clone();
        base.set_fragment(None);
        let separator = if base.query().is_some() { "&" } else { "?" };
        return Some(format!("{base}{separator}q={QUERY_PLACEHOLDER}"));
    }

    None
}
