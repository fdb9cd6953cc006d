//! EmailPreview: the minimal projection of a message returned to callers

use serde::Serialize;

/// One message flattened out of a thread: sender, subject, snippet.
///
/// `from` and `subject` are `None` when the message carries no such
/// header; that is normal data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailPreview {
    /// Gmail message ID
    pub id: String,
    /// ID of the thread this message belongs to
    pub thread_id: String,
    /// Server-generated preview text
    pub snippet: String,
    /// Value of the From header, if present
    pub from: Option<String>,
    /// Value of the Subject header, if present
    pub subject: Option<String>,
}
