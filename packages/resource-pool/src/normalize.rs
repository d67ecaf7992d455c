//! URL canonicalization.
//!
//! Every URL that enters the pool or identifies a site entry goes through
//! [`normalize`] first, so uniqueness checks and effective-view merges all
//! compare the same canonical form. [`strip_tracking`] additionally removes
//! tracking query parameters and is applied to document candidates only —
//! never to site-entry identity URLs, where the query string can be
//! load-bearing (search templates).

use url::Url;

/// Query keys removed by [`strip_tracking`], matched exactly.
const TRACKING_KEYS: &[&str] = &[
    "gclid", "fbclid", "igshid", "yclid", "mc_cid", "mc_eid", "mkt_tok", "ref", "ref_src", "spm",
    "share_id", "_hsenc", "_hsmi",
];

/// Canonicalize a URL for identity comparison.
///
/// Rejects non-http(s) schemes. Lower-cases scheme and host, drops the
/// fragment, collapses an empty path to `/`, and trims a single trailing
/// slash from non-root paths. Idempotent: normalizing an already-normalized
/// URL returns it unchanged.
pub fn normalize(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;
    url.set_fragment(None);

    let mut out = url.to_string();
    // Url::to_string already lowercases scheme and host and gives the empty
    // path as "/". Trim one trailing slash so `/a/` and `/a` compare equal,
    // keeping the bare root form `https://host/`.
    if out.ends_with('/') && url.path() != "/" && url.query().is_none() {
        out.pop();
    }
    Some(out)
}

/// Remove tracking query parameters, then re-normalize.
///
/// Drops any `utm_*` key plus a fixed deny-list (`gclid`, `fbclid`, ...).
/// Used for document-candidate URLs only.
pub fn strip_tracking(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    normalize(cleaned.as_str())
}

fn is_tracking_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_KEYS.contains(&key.as_str())
}

/// Lower-cased host with a leading `www.` stripped.
pub fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// True when both URLs share a registrable domain per [`domain_of`].
pub fn same_domain(a: &str, b: &str) -> bool {
    match (domain_of(a), domain_of(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}
