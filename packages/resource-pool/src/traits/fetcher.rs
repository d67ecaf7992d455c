//! Page fetcher trait.

use async_trait::async_trait;

use crate::error::FetchResult;

/// One fetched response, body kept as bytes so gzip sitemap payloads can be
/// decompressed by the caller.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects — anchors resolve against this, not the request URL.
    pub final_url: String,
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedPage {
    pub fn new(final_url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            final_url: final_url.into(),
            status,
            body,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Fetches pages from untrusted third-party hosts.
///
/// Implementations carry a timeout and at most one retry per request;
/// nothing above this trait retries again.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Lightweight existence check: 2xx after redirects.
    async fn probe(&self, url: &str) -> bool {
        self.fetch(url).await.is_ok()
    }
}
