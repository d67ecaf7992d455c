//! Search-template rendering and result-page anchor extraction.

use scraper::{Html, Selector};
use url::Url;

use crate::types::entry::{PAGE_PLACEHOLDER, QUERY_PLACEHOLDER};

/// Substitute the placeholders with URL-encoded joined terms and a literal
/// first page number.
pub fn render_template(template: &str, terms: &[String]) -> String {
    let joined = terms.join(" ");
    let encoded = urlencoding::encode(&joined);
    template
        .replace(QUERY_PLACEHOLDER, &encoded)
        .replace(PAGE_PLACEHOLDER, "1")
}

/// Extract anchor targets from a result page, resolved against the fetched
/// page's URL. Keeps http(s) only; cross-domain filtering is the caller's
/// job (it knows the entry's domain).
pub fn extract_anchors(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let mut anchors = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let resolved = resolved.to_string();
        if !anchors.contains(&resolved) {
            anchors.push(resolved);
        }
    }
    anchors
}
