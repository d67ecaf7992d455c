//! Home-page markup scanning: feed links and GET search forms.

use scraper::{Html, Selector};
use url::Url;

use crate::normalize::normalize;
use crate::types::entry::QUERY_PLACEHOLDER;

/// Input names recognized as search query parameters.
const QUERY_INPUT_NAMES: &[&str] = &["q", "query", "keyword", "keywords", "search", "s"];

/// Extract feed URLs from `<link rel="alternate">` elements whose type looks
/// like RSS/Atom/XML, resolved against the page URL.
pub fn extract_feed_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(r#"link[rel="alternate"][href]"#) else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let mut feeds = Vec::new();
    for element in document.select(&selector) {
        let kind = element
            .value()
            .attr("type")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !(kind.contains("rss") || kind.contains("atom") || kind.contains("xml")) {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if let Some(feed_url) = normalize(resolved.as_str()) {
            if !feeds.contains(&feed_url) {
                feeds.push(feed_url);
            }
        }
    }
    feeds
}

/// Find the first GET form with a text-like input named like a query
/// parameter, and synthesize a search template from its action URL.
pub fn extract_search_form(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input[name]").ok()?;
    let base = Url::parse(base_url).ok()?;

    for form in document.select(&form_selector) {
        let method = form
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_ascii_lowercase();
        if method != "get" {
            continue;
        }

        let Some(input_name) = form.select(&input_selector).find_map(|input| {
            let kind = input
                .value()
                .attr("type")
                .unwrap_or("text")
                .to_ascii_lowercase();
            if kind != "text" && kind != "search" {
                return None;
            }
            let name = input.value().attr("name")?.to_ascii_lowercase();
            QUERY_INPUT_NAMES.contains(&name.as_str()).then_some(name)
        }) else {
            continue;
        };

        let action = form.value().attr("action").unwrap_or("");
        let resolved = base.join(action).ok()?;
        let action_url = normalize(resolved.as_str())?;
        let separator = if action_url.contains('?') { "&" } else { "?" };
        return Some(format!(
            "{action_url}{separator}{input_name}={QUERY_PLACEHOLDER}"
        ));
    }
    None
}
