//! Gmail API HTTP client
//!
//! Covers the two outbound calls the pipeline makes: listing recent
//! thread ids (one GET per page) and posting the multipart batch
//! request (one POST for N thread lookups). Uses synchronous HTTP
//! (ureq) to be executor-agnostic.

use std::time::Duration;

use super::api::ListThreadsResponse;
use crate::error::FetchError;

/// Raw result of a batch POST: the response Content-Type (carrying
/// the server-chosen boundary) and the undecoded multipart text.
#[derive(Debug, Clone)]
pub struct RawBatchResponse {
    pub content_type: String,
    pub body: String,
}

/// Gmail API client
pub struct GmailClient {
    agent: ureq::Agent,
    base_url: String,
    batch_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Gmail batch endpoint (separate host path from the REST base)
    const BATCH_URL: &'static str = "https://gmail.googleapis.com/batch/gmail/v1";

    /// Create a client with the given request timeout.
    ///
    /// The timeout is the pipeline's only cancellation point; nothing
    /// else interrupts a fetch in flight.
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: Self::BASE_URL.to_string(),
            batch_url: Self::BATCH_URL.to_string(),
        }
    }

    /// Override both endpoints (tests against a local server)
    pub fn with_base_urls(mut self, base_url: impl Into<String>, batch_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.batch_url = batch_url.into();
        self
    }

    /// List one page of thread ids matching a query.
    ///
    /// # Arguments
    /// * `query` - Gmail search filter, e.g. `newer_than:1d`
    /// * `max_results` - Page size (the API caps this at 500)
    /// * `page_token` - Continuation token from the previous page
    pub fn list_threads(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListThreadsResponse, FetchError> {
        let mut url = format!(
            "{}/users/me/threads?q={}&maxResults={}",
            self.base_url,
            urlencoding::encode(query),
            max_results.min(500)
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {access_token}"))
            .call()
            .map_err(|e| map_call_error(e, "list threads"))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| FetchError::Protocol(format!("list threads response: {e}")))
    }

    /// Post one multipart/mixed batch body and return the raw response.
    ///
    /// An HTTP 200 here only means the batch envelope was accepted;
    /// individual embedded lookups may still have failed. That is the
    /// parser's concern, not this one.
    pub fn send_batch(
        &self,
        access_token: &str,
        boundary: &str,
        body: &str,
    ) -> Result<RawBatchResponse, FetchError> {
        let mut response = self
            .agent
            .post(&self.batch_url)
            .header("Authorization", &format!("Bearer {access_token}"))
            .header(
                "Content-Type",
                &format!("multipart/mixed; boundary={boundary}"),
            )
            .send(body)
            .map_err(|e| map_call_error(e, "batch request"))?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Transient(format!("batch response body: {e}")))?;

        Ok(RawBatchResponse {
            content_type,
            body: text,
        })
    }
}

/// Map a ureq failure onto the pipeline error taxonomy.
fn map_call_error(err: ureq::Error, context: &str) -> FetchError {
    match err {
        ureq::Error::StatusCode(code) => FetchError::from_status(code, context),
        other => FetchError::Transient(format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// One-shot HTTP server on a local port. Serves a canned response
    /// and hands back the raw request (head plus body) for assertions.
    fn spawn_server(
        status_line: &str,
        content_type: &str,
        response_body: &str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let status_line = status_line.to_string();
        let content_type = content_type.to_string();
        let response_body = response_body.to_string();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.trim_end().is_empty() {
                    break;
                }
                if let Some(value) = line
                    .to_ascii_lowercase()
                    .trim_end()
                    .strip_prefix("content-length:")
                {
                    content_length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                content_type,
                response_body.len(),
                response_body
            );
            stream.write_all(response.as_bytes()).unwrap();

            format!("{head}\r\n{}", String::from_utf8(body).unwrap())
        });

        (url, handle)
    }

    fn make_client(base_url: &str) -> GmailClient {
        GmailClient::new(Duration::from_secs(5)).with_base_urls(base_url, base_url)
    }

    #[test]
    fn test_list_threads_builds_query_and_parses_response() {
        let (url, server) = spawn_server(
            "200 OK",
            "application/json",
            r#"{"threads": [{"id": "t1"}, {"id": "t2"}], "nextPageToken": "next"}"#,
        );

        let client = make_client(&url);
        let page = client
            .list_threads("tok", "newer_than:1d", 10, Some("p1"))
            .unwrap();

        assert_eq!(page.threads.unwrap().len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("next"));

        // Header name casing on the wire is not ours to pin down.
        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.contains("get /users/me/threads?q=newer_than%3a1d&maxresults=10&pagetoken=p1"));
        assert!(request.contains("authorization: bearer tok"));
    }

    #[test]
    fn test_list_threads_unauthorized_is_auth_error() {
        let (url, server) = spawn_server("401 Unauthorized", "application/json", r#"{}"#);

        let err = make_client(&url)
            .list_threads("bad-tok", "newer_than:1d", 10, None)
            .unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_send_batch_posts_body_and_returns_raw_response() {
        let (url, server) = spawn_server(
            "200 OK",
            "multipart/mixed; boundary=reply_b",
            "--reply_b--\r\n",
        );

        let client = make_client(&url);
        let raw = client
            .send_batch("tok", "req_b", "--req_b--\r\n")
            .unwrap();

        assert_eq!(raw.content_type, "multipart/mixed; boundary=reply_b");
        assert_eq!(raw.body, "--reply_b--\r\n");

        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.contains("post /"));
        assert!(request.contains("content-type: multipart/mixed; boundary=req_b"));
        assert!(request.ends_with("--req_b--\r\n"));
    }

    #[test]
    fn test_map_status_errors() {
        let err = map_call_error(ureq::Error::StatusCode(401), "list threads");
        assert!(matches!(err, FetchError::Auth(_)));

        let err = map_call_error(ureq::Error::StatusCode(502), "batch request");
        assert!(matches!(err, FetchError::Transient(_)));

        let err = map_call_error(ureq::Error::StatusCode(404), "batch request");
        assert!(matches!(err, FetchError::Fatal { status: 404, .. }));
    }
}
