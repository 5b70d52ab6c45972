//! Domain errors and the stored failure taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain-level error type shared across crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure code stored on a notification row when it enters `failed`.
///
/// `VALIDATION_ERROR` is surfaced only in HTTP responses and never stored,
/// so it is not part of this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "USER_FETCH_ERROR")]
    UserFetch,
    #[serde(rename = "TEMPLATE_FETCH_ERROR")]
    TemplateFetch,
    #[serde(rename = "PARSE_ERROR")]
    Parse,
    #[serde(rename = "QUEUE_ERROR")]
    Queue,
    #[serde(rename = "TIMEOUT")]
    Timeout,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserFetch => "USER_FETCH_ERROR",
            ErrorCode::TemplateFetch => "TEMPLATE_FETCH_ERROR",
            ErrorCode::Parse => "PARSE_ERROR",
            ErrorCode::Queue => "QUEUE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
