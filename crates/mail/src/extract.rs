//! Flattening parsed threads into preview records
//!
//! Converts batch-parser output to the caller-facing shape: every
//! message across every thread, in thread-then-message order, reduced
//! to sender, subject, and snippet.

use std::collections::HashMap;

use crate::gmail::api::{GmailMessage, Thread};
use crate::models::EmailPreview;

/// Flatten threads into ordered [`EmailPreview`] records.
///
/// Threads with zero messages contribute nothing. Messages repeated
/// across overlapping threads appear once per occurrence; deduplication
/// is deliberately not done here.
pub fn extract_previews(threads: &[Thread]) -> Vec<EmailPreview> {
    threads
        .iter()
        .flat_map(|thread| thread.messages.iter())
        .map(preview_of)
        .collect()
}

fn preview_of(message: &GmailMessage) -> EmailPreview {
    let headers = header_map(message);
    EmailPreview {
        id: message.id.clone(),
        thread_id: message.thread_id.clone(),
        snippet: message.snippet.clone(),
        from: headers.get("from").cloned(),
        subject: headers.get("subject").cloned(),
    }
}

/// Build a lookup map from a message's header list.
///
/// Names are lowercased at construction: RFC 2822 header names are
/// case-insensitive, so `FROM` and `From` must resolve identically.
/// Later duplicates of a name win, matching map-insertion semantics
/// upstream systems tend to exhibit.
fn header_map(message: &GmailMessage) -> HashMap<String, String> {
    message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .map(|headers| {
            headers
                .iter()
                .map(|h| (h.name.to_ascii_lowercase(), h.value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
