//! Paged tariff line fetch with saturation stop.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use hsmatch_core::Hs10Entry;
use hsmatch_store::{LeafSource, StoreError};
use tracing::{debug, info, warn};

use crate::SyncError;
use crate::parse::parse_page;

pub const DEFAULT_MAX_PAGES: usize = 9;

/// One page of raw search results for a heading.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch page `index` (1-based) of the results for `four_digit`.
    async fn page(&self, four_digit: &str, index: usize) -> Result<String, SyncError>;
}

/// Fetches every tariff line under a heading, page by page.
pub struct LeafClient {
    pages: Arc<dyn PageSource>,
    max_pages: usize,
}

impl LeafClient {
    pub fn new(pages: Arc<dyn PageSource>, max_pages: usize) -> Self {
        Self { pages, max_pages }
    }

    /// Collect the tariff lines under `four_digit`, deduplicated by code in
    /// first-seen order.
    ///
    /// Stops at the first page that adds no new code, or after `max_pages`.
    /// A failure on the first page is an error; a later failure keeps what
    /// was gathered so far.
    pub async fn fetch(&self, four_digit: &str) -> Result<Vec<Hs10Entry>, SyncError> {
        if four_digit.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for index in 1..=self.max_pages {
            let page = match self.pages.page(four_digit, index).await {
                Ok(html) => parse_page(&html, four_digit),
                Err(e) => Err(e),
            };
            let rows = match page {
                Ok(rows) => rows,
                Err(e) if index == 1 => return Err(e),
                Err(e) => {
                    warn!(
                        code = four_digit,
                        page = index,
                        error = %e,
                        "page failed, keeping earlier rows"
                    );
                    break;
                }
            };

            let before = entries.len();
            for row in rows {
                if seen.insert(row.code.clone()) {
                    entries.push(row);
                }
            }
            let added = entries.len() - before;
            debug!(code = four_digit, page = index, added, "parsed HS code page");
            if added == 0 {
                break;
            }
        }

        info!(code = four_digit, lines = entries.len(), "fetched tariff lines");
        Ok(entries)
    }
}

#[async_trait]
impl LeafSource for LeafClient {
    async fn fetch_leaves(&self, four_digit: &str) -> Result<Vec<Hs10Entry>, StoreError> {
        self.fetch(four_digit)
            .await
            .map_err(|e| StoreError::ReferenceFetch {
                code: four_digit.to_string(),
                reason: e.to_string(),
            })
    }
}
