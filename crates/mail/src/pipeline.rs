//! Fetch pipeline orchestration
//!
//! Composes listing, batch building, transport, parsing, and
//! extraction into one linear pass:
//!
//! Listing -> Building -> Sending -> Parsing -> Extracting
//!
//! Each stage blocks until complete; an error in any stage terminates
//! the pass with that stage's [`FetchError`] kind. The pipeline never
//! retries internally - retry policy belongs to the caller, informed
//! by the error kind. A pipeline instance holds no per-fetch state, so
//! repeated and concurrent fetches are independent.

use std::time::Instant;

use crate::batch::{build_batch_body, make_boundary, parse_batch_response};
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::extract::extract_previews;
use crate::gmail::api::{ListThreadsResponse, ThreadRef};
use crate::gmail::{recency_query, GmailClient, RawBatchResponse};
use crate::models::EmailPreview;

/// Network seam for the pipeline: one page of thread listing, and one
/// batch POST. [`GmailClient`] is the production implementation; tests
/// substitute stubs.
pub trait Transport: Send + Sync {
    /// List one page of thread refs matching a query
    fn list_threads(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListThreadsResponse, FetchError>;

    /// Send one multipart/mixed batch body
    fn send_batch(
        &self,
        access_token: &str,
        boundary: &str,
        body: &str,
    ) -> Result<RawBatchResponse, FetchError>;
}

impl Transport for GmailClient {
    fn list_threads(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListThreadsResponse, FetchError> {
        GmailClient::list_threads(self, access_token, query, max_results, page_token)
    }

    fn send_batch(
        &self,
        access_token: &str,
        boundary: &str,
        body: &str,
    ) -> Result<RawBatchResponse, FetchError> {
        GmailClient::send_batch(self, access_token, boundary, body)
    }
}

// Lets tests and callers share a transport while handing the pipeline
// its own handle.
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn list_threads(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListThreadsResponse, FetchError> {
        (**self).list_threads(access_token, query, max_results, page_token)
    }

    fn send_batch(
        &self,
        access_token: &str,
        boundary: &str,
        body: &str,
    ) -> Result<RawBatchResponse, FetchError> {
        (**self).send_batch(access_token, boundary, body)
    }
}

/// Counters from one fetch pass
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    /// Thread refs returned by the listing stage
    pub threads_listed: usize,
    /// Threads recovered from the batch response
    pub threads_parsed: usize,
    /// Batch parts dropped (non-2xx status or unparsable body)
    pub parts_dropped: usize,
    /// Preview records produced
    pub previews: usize,
    /// Wall-clock duration of the whole pass
    pub duration_ms: u64,
}

/// Result of one fetch pass: the previews plus observability counters.
///
/// `previews.len()` always equals the total message count across the
/// successfully parsed threads; dropped parts only shrink the list.
#[derive(Debug)]
pub struct FetchReport {
    pub previews: Vec<EmailPreview>,
    pub stats: FetchStats,
}

/// The batched thread-fetch pipeline
pub struct FetchPipeline<T: Transport> {
    transport: T,
    config: FetchConfig,
}

impl<T: Transport> FetchPipeline<T> {
    /// Create a pipeline with default tunables
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FetchConfig::default())
    }

    pub fn with_config(transport: T, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch previews for threads in the configured recency window.
    pub fn fetch_recent(
        &self,
        access_token: &str,
        max_threads: usize,
    ) -> Result<FetchReport, FetchError> {
        self.fetch(access_token, &recency_query(self.config.window_days), max_threads)
    }

    /// Run one full pass: list threads matching `query`, fetch them in
    /// a single batch call, and flatten the results into previews.
    pub fn fetch(
        &self,
        access_token: &str,
        query: &str,
        max_threads: usize,
    ) -> Result<FetchReport, FetchError> {
        let start = Instant::now();
        let ceiling = self.config.clamp_threads(max_threads);

        // Listing
        let refs = self.list_all(access_token, query, ceiling)?;
        let mut stats = FetchStats {
            threads_listed: refs.len(),
            ..Default::default()
        };

        if refs.is_empty() {
            stats.duration_ms = start.elapsed().as_millis() as u64;
            log::info!("no threads matched query {query:?}; skipping batch call");
            return Ok(FetchReport {
                previews: Vec::new(),
                stats,
            });
        }

        // Building
        let boundary = make_boundary();
        let body = build_batch_body(&refs, &boundary);

        // Sending
        let raw = self.transport.send_batch(access_token, &boundary, &body)?;

        // Parsing
        let outcome = parse_batch_response(&raw.content_type, &raw.body)?;
        stats.threads_parsed = outcome.threads.len();
        stats.parts_dropped = outcome.dropped;
        if outcome.dropped > 0 {
            log::warn!(
                "batch response: {} of {} parts dropped",
                outcome.dropped,
                refs.len()
            );
        }

        // Extracting
        let previews = extract_previews(&outcome.threads);
        stats.previews = previews.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "fetched {} previews from {} threads in {}ms",
            stats.previews,
            stats.threads_parsed,
            stats.duration_ms
        );

        Ok(FetchReport { previews, stats })
    }

    /// Accumulate thread refs across listing pages up to a ceiling.
    fn list_all(
        &self,
        access_token: &str,
        query: &str,
        ceiling: usize,
    ) -> Result<Vec<ThreadRef>, FetchError> {
        let mut refs: Vec<ThreadRef> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            if refs.len() >= ceiling {
                break;
            }

            let page =
                self.transport
                    .list_threads(access_token, query, ceiling, page_token.as_deref())?;

            // An empty page is `"threads": []`; a response without the
            // array at all means the endpoint changed shape under us.
            let Some(threads) = page.threads else {
                return Err(FetchError::Protocol(
                    "listing response missing 'threads' field".to_string(),
                ));
            };
            refs.extend(threads);
            log::debug!("listing page done, {} refs so far", refs.len());

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        refs.truncate(ceiling);
        Ok(refs)
    }
}
