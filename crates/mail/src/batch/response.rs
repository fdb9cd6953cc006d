//! Batch response demultiplexing
//!
//! Splits one multipart/mixed payload into its embedded HTTP
//! sub-responses and recovers a Thread from each successful one.
//!
//! The policy throughout is scan-and-skip: a batch of N lookups where
//! M fail must still yield the N-M good threads. A part is dropped
//! (never fatal) when its status line is not 2xx or its JSON body does
//! not parse. Only a top-level contract violation - no boundary in the
//! Content-Type - is an error.

use crate::error::FetchError;
use crate::gmail::api::Thread;

/// Parsed batch response: surviving threads in appearance order, plus
/// how many parts were dropped.
///
/// The endpoint preserves request order on a best-effort basis only;
/// callers must not assume positional correspondence with the request.
#[derive(Debug)]
pub struct BatchOutcome {
    pub threads: Vec<Thread>,
    pub dropped: usize,
}

/// Demultiplex a raw batch response into Threads.
///
/// `content_type` is the top-level response Content-Type header, which
/// carries the server-chosen boundary.
pub fn parse_batch_response(content_type: &str, raw: &str) -> Result<BatchOutcome, FetchError> {
    let boundary = extract_boundary(content_type)?;
    let delimiter = format!("--{boundary}");

    let mut threads = Vec::new();
    let mut dropped = 0;

    for segment in raw.split(delimiter.as_str()) {
        let segment = segment.trim();
        // Empty lead-in, trailing whitespace, or the closing "--".
        if segment.is_empty() || segment == "--" {
            continue;
        }

        if !has_success_status(segment) {
            log::debug!("dropping batch part without 2xx status");
            dropped += 1;
            continue;
        }

        // The JSON document starts at the first brace after the
        // embedded status line and header block.
        let Some(json_start) = segment.find('{') else {
            dropped += 1;
            continue;
        };

        match serde_json::from_str::<Thread>(&segment[json_start..]) {
            Ok(thread) => threads.push(thread),
            Err(e) => {
                log::debug!("dropping batch part with unparsable body: {e}");
                dropped += 1;
            }
        }
    }

    Ok(BatchOutcome { threads, dropped })
}

/// Pull the boundary token out of a Content-Type header value.
fn extract_boundary(content_type: &str) -> Result<String, FetchError> {
    let rest = content_type
        .split("boundary=")
        .nth(1)
        .ok_or_else(|| {
            FetchError::Protocol(format!("no boundary in Content-Type: {content_type:?}"))
        })?;

    let token = rest
        .split(';')
        .next()
        .unwrap_or(rest)
        .trim()
        .trim_matches('"');

    if token.is_empty() {
        return Err(FetchError::Protocol(format!(
            "empty boundary in Content-Type: {content_type:?}"
        )));
    }
    Ok(token.to_string())
}

/// Whether a segment's first embedded status line reports 2xx.
fn has_success_status(segment: &str) -> bool {
    segment
        .lines()
        .find_map(|line| {
            let rest = line.trim_start().strip_prefix("HTTP/1.1 ")?;
            rest.get(..3)?.parse::<u16>().ok()
        })
        .is_some_and(|code| (200..300).contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CT: &str = "multipart/mixed; boundary=batch_abc";

    fn part(status: &str, body: &str) -> String {
        format!(
            "--batch_abc\r\nContent-Type: application/http\r\n\r\n\
             HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\r\n{body}\r\n"
        )
    }

    fn closing() -> &'static str {
        "--batch_abc--\r\n"
    }

    #[test]
    fn test_parses_successful_parts() {
        let raw = format!(
            "{}{}{}",
            part("200 OK", r#"{"id": "t1", "messages": []}"#),
            part("200 OK", r#"{"id": "t2"}"#),
            closing()
        );

        let outcome = parse_batch_response(CT, &raw).unwrap();
        assert_eq!(outcome.threads.len(), 2);
        assert_eq!(outcome.threads[0].id, "t1");
        assert_eq!(outcome.threads[1].id, "t2");
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn test_drops_non_2xx_parts_keeps_order() {
        let raw = format!(
            "{}{}{}{}",
            part("404 Not Found", r#"{"error": {"code": 404}}"#),
            part("200 OK", r#"{"id": "t1"}"#),
            part("500 Internal Server Error", r#"{"error": {"code": 500}}"#),
            closing()
        );

        let outcome = parse_batch_response(CT, &raw).unwrap();
        assert_eq!(outcome.threads.len(), 1);
        assert_eq!(outcome.threads[0].id, "t1");
        assert_eq!(outcome.dropped, 2);
    }

    #[test]
    fn test_accepts_any_2xx() {
        let raw = format!("{}{}", part("204 No Content", r#"{"id": "t1"}"#), closing());
        let outcome = parse_batch_response(CT, &raw).unwrap();
        assert_eq!(outcome.threads.len(), 1);
    }

    #[test]
    fn test_drops_part_with_malformed_json() {
        let raw = format!(
            "{}{}{}",
            part("200 OK", r#"{"id": "t1"#),
            part("200 OK", r#"{"id": "t2"}"#),
            closing()
        );

        let outcome = parse_batch_response(CT, &raw).unwrap();
        assert_eq!(outcome.threads.len(), 1);
        assert_eq!(outcome.threads[0].id, "t2");
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_drops_part_without_json_body() {
        let raw = format!("{}{}", part("200 OK", ""), closing());
        let outcome = parse_batch_response(CT, &raw).unwrap();
        assert!(outcome.threads.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_zero_parts_is_empty_not_error() {
        let outcome = parse_batch_response(CT, closing()).unwrap();
        assert!(outcome.threads.is_empty());
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn test_missing_boundary_is_protocol_error() {
        let err = parse_batch_response("application/json", "{}").unwrap_err();
        assert!(matches!(err, FetchError::Protocol(_)));
    }

    #[test]
    fn test_boundary_extraction_variants() {
        assert_eq!(
            extract_boundary("multipart/mixed; boundary=abc").unwrap(),
            "abc"
        );
        assert_eq!(
            extract_boundary("multipart/mixed; boundary=\"abc\"").unwrap(),
            "abc"
        );
        assert_eq!(
            extract_boundary("multipart/mixed; boundary=abc; charset=UTF-8").unwrap(),
            "abc"
        );
        assert!(extract_boundary("multipart/mixed; boundary=").is_err());
    }
}
