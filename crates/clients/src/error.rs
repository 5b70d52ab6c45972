//! Client error classification.

/// Error from a remote service call.
///
/// The transient/permanent split drives the retry loop: transient errors
/// consume backoff budget, permanent ones abort immediately.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-level failure: DNS, connect, TLS, or per-attempt timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote rejected the request (4xx). Retrying cannot help.
    #[error("client error: HTTP {0}")]
    Permanent(u16),

    /// The remote failed (5xx or other non-2xx). Worth retrying.
    #[error("server error: HTTP {0}")]
    Server(u16),

    /// The remote answered 2xx but the payload did not conform.
    #[error("malformed response payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ClientError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Server(_))
    }

    /// Whether the payload itself was malformed (surfaced as `PARSE_ERROR`).
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }
}
