//! Gmail API integration
//!
//! This module provides:
//! - Wire types for the threads list and batch endpoints
//! - Token provider with refresh handling and pluggable storage
//! - HTTP client for listing threads and posting batch requests

mod auth;
mod client;

pub use auth::{FileTokenStore, InMemoryTokenStore, Token, TokenProvider, TokenStore};
pub use client::{GmailClient, RawBatchResponse};

/// Build the server-side recency filter for the threads listing query.
///
/// Gmail interprets `newer_than:Nd` as "messages received in the last
/// N days".
pub fn recency_query(days: u32) -> String {
    format!("newer_than:{days}d")
}

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from listing threads
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListThreadsResponse {
        pub threads: Option<Vec<ThreadRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a thread as returned by the listing endpoint
    #[derive(Debug, Clone, Deserialize)]
    pub struct ThreadRef {
        pub id: String,
        /// Listing snippet; unused downstream but present on the wire.
        pub snippet: Option<String>,
    }

    /// A full thread from the batch endpoint: one conversation with
    /// its messages in order. A thread with zero messages is valid.
    #[derive(Debug, Deserialize)]
    pub struct Thread {
        pub id: String,
        #[serde(default)]
        pub messages: Vec<GmailMessage>,
    }

    /// Full message from the Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: String,
        #[serde(default)]
        pub snippet: String,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload carrying the header list
    #[derive(Debug, Deserialize)]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }
}

#[cfg(test)]
mod tests {
    use super::api::{ListThreadsResponse, Thread};
    use super::recency_query;

    #[test]
    fn test_recency_query() {
        assert_eq!(recency_query(1), "newer_than:1d");
        assert_eq!(recency_query(7), "newer_than:7d");
    }

    #[test]
    fn test_deserialize_listing() {
        let json = r#"{
            "threads": [{"id": "t1", "snippet": "hi"}, {"id": "t2"}],
            "nextPageToken": "abc",
            "resultSizeEstimate": 2
        }"#;
        let list: ListThreadsResponse = serde_json::from_str(json).unwrap();
        let threads = list.threads.unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, "t1");
        assert_eq!(threads[1].snippet, None);
        assert_eq!(list.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_deserialize_empty_listing() {
        let list: ListThreadsResponse = serde_json::from_str("{}").unwrap();
        assert!(list.threads.is_none());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_thread_messages_default_empty() {
        let thread: Thread = serde_json::from_str(r#"{"id": "t1"}"#).unwrap();
        assert_eq!(thread.id, "t1");
        assert!(thread.messages.is_empty());
    }
}
