//! Sitemap expansion: urlset collection and recursive index traversal.
//!
//! Index recursion is bounded three ways — depth, a total-fetch budget, and
//! a visited set — so adversarial or self-referential indices terminate
//! with a finite URL set.

use std::collections::HashSet;
use std::io::Read;

use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::normalize::same_domain;
use crate::traits::PageFetcher;

/// Recursion bounds for one sitemap entry.
#[derive(Debug, Clone, Copy)]
pub struct SitemapLimits {
    pub max_depth: usize,
    pub fetch_budget: usize,
}

/// Parsed payload: either page locations or child sitemap locations.
#[derive(Debug, PartialEq)]
enum SitemapDoc {
    Urlset(Vec<String>),
    Index(Vec<String>),
}

/// Fetch and expand a sitemap entry into same-domain page URLs.
///
/// Returns the collected URLs plus per-document errors; a child sitemap
/// that fails to fetch or parse is recorded and skipped, never fatal.
pub async fn collect_sitemap_urls<F: PageFetcher>(
    fetcher: &F,
    entry_url: &str,
    limits: SitemapLimits,
) -> (Vec<String>, Vec<String>) {
    let mut urls = Vec::new();
    let mut errors = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: Vec<(String, usize)> = vec![(entry_url.to_string(), 0)];
    let mut fetches = 0usize;

    visited.insert(entry_url.to_string());

    while let Some((url, depth)) = queue.pop() {
        if fetches >= limits.fetch_budget {
            errors.push(format!("fetch budget exhausted at {url}"));
            break;
        }
        fetches += 1;

        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };

        let body = match decompress_if_gzip(&page.body, &url) {
            Ok(body) => body,
            Err(e) => {
                errors.push(format!("gunzip failed for {url}: {e}"));
                continue;
            }
        };

        match parse_sitemap(&body) {
            Ok(SitemapDoc::Urlset(locs)) => {
                for loc in locs {
                    if same_domain(&loc, entry_url) && !urls.contains(&loc) {
                        urls.push(loc);
                    }
                }
            }
            Ok(SitemapDoc::Index(children)) => {
                if depth >= limits.max_depth {
                    errors.push(format!("max depth reached at {url}"));
                    continue;
                }
                for child in children {
                    if visited.insert(child.clone()) {
                        queue.push((child, depth + 1));
                    }
                }
            }
            Err(e) => {
                errors.push(format!("sitemap parse failed for {url}: {e}"));
            }
        }
    }

    (urls, errors)
}

fn decompress_if_gzip(body: &[u8], url: &str) -> Result<Vec<u8>, String> {
    let looks_gzipped = url.ends_with(".gz") || body.starts_with(&[0x1f, 0x8b]);
    if !looks_gzipped {
        return Ok(body.to_vec());
    }
    let mut decoder = GzDecoder::new(body);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

fn parse_sitemap(body: &[u8]) -> Result<SitemapDoc, String> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut is_index = false;
    let mut saw_root = false;
    let mut in_loc = false;
    let mut locs = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => {
                    is_index = true;
                    saw_root = true;
                }
                b"urlset" => {
                    saw_root = true;
                }
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::Text(text)) if in_loc => {
                let loc = text
                    .unescape()
                    .map_err(|e| e.to_string())?
                    .trim()
                    .to_string();
                if !loc.is_empty() {
                    locs.push(loc);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
        buf.clear();
    }

    if !saw_root {
        return Err("no urlset or sitemapindex root".to_string());
    }
    Ok(if is_index {
        SitemapDoc::Index(locs)
    } else {
        SitemapDoc::Urlset(locs)
    })
}
