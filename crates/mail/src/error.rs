//! Error taxonomy for the fetch pipeline
//!
//! Every stage surfaces one of four kinds so callers can pick a retry
//! policy without string-matching: `Auth` (refresh the token and
//! re-invoke), `Transient` (safe to retry the whole pipeline, all
//! operations are read-only), `Protocol` (upstream contract change,
//! do not retry), `Fatal` (malformed request, do not retry).

/// Pipeline failure, classified by what the caller should do about it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Token expired or invalid (HTTP 401/403). Not retried internally;
    /// the caller refreshes credentials and re-invokes.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network failure, timeout, or 5xx. The pipeline is read-only and
    /// idempotent, so the whole fetch may be retried.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Response violated the expected wire contract (missing multipart
    /// boundary, unparsable top-level JSON).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A 4xx other than auth: the request itself was rejected.
    #[error("request rejected (HTTP {status}): {message}")]
    Fatal { status: u16, message: String },
}

impl FetchError {
    /// Classify an HTTP status code returned by the Gmail API.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{context}: HTTP {status}")),
            500..=599 => Self::Transient(format!("{context}: HTTP {status}")),
            _ => Self::Fatal {
                status,
                message: context.to_string(),
            },
        }
    }

    /// Whether retrying the whole pipeline can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FetchError::from_status(401, "list"),
            FetchError::Auth(_)
        ));
        assert!(matches!(
            FetchError::from_status(403, "list"),
            FetchError::Auth(_)
        ));
        assert!(matches!(
            FetchError::from_status(503, "batch"),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            FetchError::from_status(400, "batch"),
            FetchError::Fatal { status: 400, .. }
        ));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(FetchError::from_status(500, "x").is_retryable());
        assert!(!FetchError::from_status(401, "x").is_retryable());
        assert!(!FetchError::from_status(404, "x").is_retryable());
        assert!(!FetchError::Protocol("bad boundary".into()).is_retryable());
    }
}
