//! Mail crate - batched Gmail thread fetching
//!
//! Given an OAuth access token, this crate discovers recent threads,
//! fetches them in a single multipart/mixed batch call, and flattens
//! the results into [`EmailPreview`] records (sender, subject,
//! snippet). It provides:
//!
//! - Wire types and a blocking HTTP client for the Gmail API
//! - Pure batch-body construction and resilient batch-response parsing
//! - Token storage and refresh behind a provider abstraction
//! - The [`FetchPipeline`] orchestrator and its [`Transport`] seam
//!
//! Individual batch parts that fail are dropped, never fatal: the
//! output list is exactly the messages of the threads that came back
//! intact, with the drop count reported in [`FetchStats`].

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod pipeline;

pub use batch::{build_batch_body, make_boundary, parse_batch_response, BatchOutcome};
pub use config::{FetchConfig, GmailCredentials, MAX_BATCH_REQUESTS};
pub use error::FetchError;
pub use extract::extract_previews;
pub use gmail::{
    recency_query, FileTokenStore, GmailClient, InMemoryTokenStore, RawBatchResponse, Token,
    TokenProvider, TokenStore,
};
pub use models::EmailPreview;
pub use pipeline::{FetchPipeline, FetchReport, FetchStats, Transport};

/// Fetch previews for threads from the last 24 hours, the way a
/// remote-callable tool would invoke it: token in, previews out.
pub fn fetch_recent_emails<T: Transport>(
    transport: T,
    access_token: &str,
    max_threads: usize,
) -> Result<Vec<EmailPreview>, FetchError> {
    FetchPipeline::new(transport)
        .fetch_recent(access_token, max_threads)
        .map(|report| report.previews)
}
