//! reqwest-backed page fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::traits::{FetchedPage, PageFetcher};

/// Maximum response body retained, to bound memory on adversarial hosts.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// HTTP fetcher with a per-request timeout and a single retry.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry_once: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: format!("client build failed: {e}"),
            })?;

        Ok(Self {
            client,
            retry_once: true,
        })
    }

    pub fn without_retry(mut self) -> Self {
        self.retry_once = false;
        self
    }

    async fn fetch_once(&self, url: &str) -> FetchResult<FetchedPage> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = response.bytes().await.map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let mut body = body.to_vec();
        body.truncate(MAX_BODY_BYTES);

        let mut page = FetchedPage::new(final_url, status.as_u16(), body);
        if let Some(ct) = content_type {
            page = page.with_content_type(ct);
        }
        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        if url::Url::parse(url)
            .map(|u| u.scheme() != "http" && u.scheme() != "https")
            .unwrap_or(true)
        {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        match self.fetch_once(url).await {
            Ok(page) => Ok(page),
            Err(first) if self.retry_once => {
                debug!(url, error = %first, "fetch failed, retrying once");
                self.fetch_once(url).await
            }
            Err(e) => Err(e),
        }
    }
}
