//! Retry of failed notifications that still have budget.
//!
//! Claims `failed` rows with `retry_count < max_retries` (failed within the
//! last 24 hours), most urgent first, appends a `retried` event, and re-runs
//! enrichment. `SKIP LOCKED` keeps concurrent sweepers from claiming the
//! same row.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use courier_core::EventType;
use courier_db::repositories::{NotificationEventRepo, NotificationRepo};

use crate::service::Orchestrator;

/// How often the sweeper scans for retryable failures.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Rows claimed per cycle.
const BATCH_SIZE: i64 = 25;

/// Background sweeper re-driving retryable failures.
pub struct FailedRetry {
    orchestrator: Arc<Orchestrator>,
}

impl FailedRetry {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = SWEEP_INTERVAL.as_secs(),
            "Failed-retry sweeper started"
        );

        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Failed-retry sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Failed-retry cycle failed");
                    }
                }
            }
        }
    }

    async fn sweep(&self) -> Result<(), sqlx::Error> {
        let pool = self.orchestrator.pool().clone();
        let mut tx = pool.begin().await?;
        let retryable = NotificationRepo::get_failed_for_retry(&mut tx, BATCH_SIZE).await?;
        tx.commit().await?;

        if retryable.is_empty() {
            return Ok(());
        }

        tracing::info!(count = retryable.len(), "Retrying failed notifications");
        for notif in &retryable {
            let channel = notif.parsed_channel().ok();
            NotificationEventRepo::create_simple(
                &pool,
                notif.id,
                &notif.correlation_id,
                EventType::Retried,
                channel,
                serde_json::json!({"retry_count": notif.retry_count}),
            )
            .await?;

            self.orchestrator.reenrich(notif).await;
        }
        Ok(())
    }
}
