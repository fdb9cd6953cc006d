//! Batch request body construction
//!
//! Pure string assembly: no I/O, byte-identical output for identical
//! inputs and boundary. The boundary itself is minted separately so
//! tests can pin it.

use crate::gmail::api::ThreadRef;

/// Generate a boundary unique to one batch invocation.
///
/// Derived from the current time plus a random suffix so the delimiter
/// cannot collide with payload content or with a concurrent fetch.
pub fn make_boundary() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("batch_{millis}_{:04x}", rand_suffix())
}

/// Serialize per-thread GET requests into one multipart/mixed body.
///
/// One part per thread ref, in input order:
/// - `Content-Type: application/http` sub-headers
/// - `Content-ID: <request-N>`, 1-indexed
/// - an embedded relative GET for the thread-detail endpoint with
///   `format=full`
///
/// Zero refs yields a body holding only the closing marker, which the
/// response side treats as zero parts.
pub fn build_batch_body(refs: &[ThreadRef], boundary: &str) -> String {
    let mut body = String::new();
    for (index, thread) in refs.iter().enumerate() {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <request-{}>\r\n\r\n", index + 1));
        body.push_str(&format!(
            "GET /gmail/v1/users/me/threads/{}?format=full HTTP/1.1\r\n\r\n",
            thread.id
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// Random 16-bit suffix without a dedicated RNG dependency
fn rand_suffix() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 0x1_0000
}
