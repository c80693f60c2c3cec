//! Saved-search result enumeration.
//!
//! Pages through a saved search's full result set and materializes the
//! complete, deduplicated list of document ids before returning. Callers
//! need the whole set to build the population table, so the sequence is
//! finite and non-restartable.

use std::collections::HashSet;

use tracing::{debug, warn};

use extfix_core::{Error, Result, SearchService};

/// Paginated consumer of a saved search's results.
pub struct SearchResultEnumerator<'a> {
    search: &'a dyn SearchService,
    page_size: i64,
    page_retries: u32,
}

impl<'a> SearchResultEnumerator<'a> {
    pub fn new(search: &'a dyn SearchService, page_size: i64, page_retries: u32) -> Self {
        Self {
            search,
            page_size,
            page_retries,
        }
    }

    /// Expand a saved search into the full list of matching document ids.
    ///
    /// The initial query failing yields an empty list: an empty or broken
    /// search produces no work rather than a failed job. Subsequent pages
    /// are retried up to the configured limit and then fail the expansion,
    /// so a permanently broken page surfaces as an error instead of
    /// stalling the total-count bookkeeping forever.
    pub async fn expand(&self, search_id: i64) -> Result<Vec<i64>> {
        let first = match self.search.query(search_id, self.page_size).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    subsystem = "search",
                    op = "expand",
                    search_id,
                    error = %e,
                    "Initial search query failed; treating as empty result set"
                );
                return Ok(Vec::new());
            }
        };

        let mut seen = HashSet::new();
        let mut document_ids: Vec<i64> = Vec::new();
        let mut counter: i64 = 0;

        counter += first.document_ids.len() as i64;
        document_ids.extend(first.document_ids.iter().filter(|id| seen.insert(**id)));

        while first.total_count > counter {
            let page = self
                .fetch_page_with_retry(search_id, &first.continuation_token, counter + 1)
                .await?;
            counter += page.len() as i64;
            document_ids.extend(page.iter().filter(|id| seen.insert(**id)));
        }

        debug!(
            subsystem = "search",
            op = "expand",
            search_id,
            row_count = document_ids.len(),
            total_count = first.total_count,
            "Search expanded"
        );
        Ok(document_ids)
    }

    /// Fetch one subsequent page, retrying failures and empty pages.
    ///
    /// An empty page counts as a failure: the running count would never
    /// reach the reported total, which is exactly the stall being guarded
    /// against.
    async fn fetch_page_with_retry(
        &self,
        search_id: i64,
        token: &str,
        offset: i64,
    ) -> Result<Vec<i64>> {
        for attempt in 1..=self.page_retries {
            match self.search.query_subset(token, offset, self.page_size).await {
                Ok(ids) if !ids.is_empty() => return Ok(ids),
                Ok(_) => {
                    warn!(
                        subsystem = "search",
                        op = "query_subset",
                        search_id,
                        offset,
                        attempt,
                        "Search page came back empty"
                    );
                }
                Err(e) => {
                    warn!(
                        subsystem = "search",
                        op = "query_subset",
                        search_id,
                        offset,
                        attempt,
                        error = %e,
                        "Search page failed"
                    );
                }
            }
        }

        Err(Error::SearchPageExhausted {
            search_id,
            offset,
            attempts: self.page_retries,
        })
    }
}
