//! Shared GET-with-retry plumbing.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::retry::RetryPolicy;

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A pooled HTTP client plus the retry policy both service clients share.
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RemoteClient {
    pub fn new(policy: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { http, policy }
    }

    /// GET `url` and decode the JSON body, retrying transient failures with
    /// exponential backoff and full jitter until the policy's elapsed budget
    /// runs out. 4xx responses and malformed payloads abort immediately.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let started = Instant::now();
        let mut delay = self.policy.initial_delay;
        let mut attempt = 1u32;

        loop {
            match self.try_get(url).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => {
                    tracing::warn!(url, attempt, error = %e, "Remote call failed permanently");
                    return Err(e);
                }
                Err(e) => {
                    let sleep_for = self.policy.jittered(delay);
                    if started.elapsed() + sleep_for >= self.policy.max_elapsed {
                        tracing::error!(url, attempt, error = %e, "Remote call retries exhausted");
                        return Err(e);
                    }
                    tracing::warn!(
                        url,
                        attempt,
                        delay_ms = sleep_for.as_millis() as u64,
                        error = %e,
                        "Remote call failed, retrying"
                    );
                    tokio::time::sleep(sleep_for).await;
                    delay = self.policy.next_delay(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Execute a single GET and classify the outcome.
    async fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status.is_client_error() {
            return Err(ClientError::Permanent(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ClientError::Server(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ClientError::Decode)
    }
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
