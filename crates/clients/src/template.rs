//! Client for the template service.

use crate::error::ClientError;
use crate::http::RemoteClient;
use crate::retry::RetryPolicy;
use crate::types::{ServiceResponse, Template};

/// Fetches message templates from the template service.
#[derive(Clone)]
pub struct TemplateClient {
    inner: RemoteClient,
    base_url: String,
}

impl TemplateClient {
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            inner: RemoteClient::new(policy),
            base_url: base_url.into(),
        }
    }

    /// `GET {base}/template/{template_id}`.
    pub async fn fetch_by_id(
        &self,
        template_id: &str,
    ) -> Result<ServiceResponse<Template>, ClientError> {
        let url = format!("{}/template/{template_id}", self.base_url);
        self.inner.get_json(&url).await
    }
}
