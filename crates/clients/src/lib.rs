//! HTTP clients for the user-preference and template services.
//!
//! Both clients share [`http::RemoteClient`], which wraps a pooled
//! `reqwest::Client` with the retry behavior remote enrichment requires:
//! exponential backoff with full jitter for transient failures (5xx,
//! network errors, timeouts), immediate short-circuit for 4xx responses.

pub mod error;
pub mod http;
pub mod retry;
pub mod template;
pub mod types;
pub mod user;

pub use error::ClientError;
pub use retry::RetryPolicy;
pub use template::TemplateClient;
pub use types::{ServiceResponse, Template, TemplateVersion, UserPreferences};
pub use user::UserPreferencesClient;
