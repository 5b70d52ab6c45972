//! Client for the user-preference service.

use crate::error::ClientError;
use crate::http::RemoteClient;
use crate::retry::RetryPolicy;
use crate::types::{ServiceResponse, UserPreferences};

/// Fetches delivery preferences from the user service.
#[derive(Clone)]
pub struct UserPreferencesClient {
    inner: RemoteClient,
    base_url: String,
}

impl UserPreferencesClient {
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            inner: RemoteClient::new(policy),
            base_url: base_url.into(),
        }
    }

    /// `GET {base}/users/preference/{user_id}`.
    pub async fn fetch_preferences(
        &self,
        user_id: &str,
    ) -> Result<ServiceResponse<UserPreferences>, ClientError> {
        let url = format!("{}/users/preference/{user_id}", self.base_url);
        self.inner.get_json(&url).await
    }
}
