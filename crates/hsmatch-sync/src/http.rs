//! reqwest-backed page source for the KITA HS code search.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::client::{DEFAULT_MAX_PAGES, LeafClient, PageSource};
use crate::SyncError;

pub const DEFAULT_BASE_URL: &str = "https://fta.kita.net/hsCode";

/// Settings for the external tariff line lookup.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Search endpoint, without query string.
    pub base_url: String,
    pub max_pages: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn page(&self, four_digit: &str, index: usize) -> Result<String, SyncError> {
        debug!(url = %self.base_url, code = four_digit, page = index, "requesting HS code page");
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("pageIndex", index.to_string().as_str()),
                ("mnSn", "207"),
                ("scGbn", "hskCd"),
                ("scKwrd", four_digit),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text().await?)
    }
}

impl LeafClient {
    /// A client that fetches pages over HTTP.
    pub fn http(config: &FetchConfig) -> Result<Self, SyncError> {
        let pages = HttpPageSource::new(&config.base_url, config.timeout)?;
        Ok(Self::new(std::sync::Arc::new(pages), config.max_pages))
    }
}
