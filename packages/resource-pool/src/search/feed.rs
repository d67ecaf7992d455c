//! RSS/Atom candidate extraction.

use feed_rs::parser;

/// Extract target URLs from a feed payload.
///
/// Handles both RSS (`item/link`, permalink `guid`) and Atom
/// (`entry/link[rel=alternate or unset]`); `feed-rs` normalizes the two
/// into one model.
pub fn extract_feed_urls(body: &[u8]) -> Result<Vec<String>, String> {
    let feed = parser::parse(body).map_err(|e| format!("feed parse failed: {e}"))?;

    let mut urls = Vec::new();
    for entry in feed.entries {
        let mut links: Vec<String> = entry
            .links
            .iter()
            .filter(|link| {
                link.rel
                    .as_deref()
                    .map(|rel| rel == "alternate")
                    .unwrap_or(true)
            })
            .map(|link| link.href.clone())
            .collect();

        // RSS permalink GUIDs arrive as the entry id.
        if links.is_empty() && entry.id.starts_with("http") {
            links.push(entry.id.clone());
        }

        for link in links {
            if !urls.contains(&link) {
                urls.push(link);
            }
        }
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_item_links() {
        let rss = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
                <title>Example</title>
                <item><title>One</title><link>https://example.com/posts/1</link></item>
                <item><title>Two</title><link>https://example.com/posts/2</link></item>
            </channel></rss>"#;
        let urls = extract_feed_urls(rss.as_bytes()).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/posts/1".to_string(),
                "https://example.com/posts/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_rss_permalink_guid_without_link() {
        let rss = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
                <title>Example</title>
                <item><title>One</title><guid isPermaLink="true">https://example.com/posts/1</guid></item>
            </channel></rss>"#;
        let urls = extract_feed_urls(rss.as_bytes()).unwrap();
        assert_eq!(urls, vec!["https://example.com/posts/1".to_string()]);
    }

    #[test]
    fn test_atom_alternate_links() {
        let atom = r#"<?xml version="1.0"?>
            <feed xmlns="http://www.w3.org/2005/Atom">
                <title>Example</title>
                <entry>
                    <title>One</title>
                    <id>urn:uuid:1</id>
                    <link rel="alternate" href="https://example.com/posts/1"/>
                    <link rel="enclosure" href="https://example.com/posts/1.mp3"/>
                </entry>
                <entry>
                    <title>Two</title>
                    <id>urn:uuid:2</id>
                    <link href="https://example.com/posts/2"/>
                </entry>
            </feed>"#;
        let urls = extract_feed_urls(atom.as_bytes()).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/posts/1".to_string(),
                "https://example.com/posts/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(extract_feed_urls(b"<html>not a feed</html>").is_err());
    }
}
