//! Recovery of notifications whose enrichment task never finished.
//!
//! The HTTP boundary acks with `202` before enrichment completes, so a
//! process crash can strand rows in `pending`. This sweeper periodically
//! selects stale `pending` rows and re-runs enrichment; the idempotency
//! constraint and the guarded status transition keep this at-least-once
//! without duplicate side effects.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use courier_db::repositories::NotificationRepo;

use crate::service::Orchestrator;

/// How often the sweeper scans for stale rows.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// How old a `pending` row must be before it is considered stranded.
const DEFAULT_STALE_AFTER_SECS: i64 = 60;

/// Rows claimed per cycle.
const BATCH_SIZE: i64 = 50;

/// Background sweeper for stranded `pending` rows.
pub struct PendingRecovery {
    orchestrator: Arc<Orchestrator>,
}

impl PendingRecovery {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        let stale_after_secs: i64 = std::env::var("ORCHESTRATOR_RECOVERY_STALE_AFTER_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STALE_AFTER_SECS);

        tracing::info!(
            interval_secs = SWEEP_INTERVAL.as_secs(),
            stale_after_secs,
            "Pending recovery sweeper started"
        );

        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Pending recovery sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep(stale_after_secs).await {
                        tracing::error!(error = %e, "Pending recovery cycle failed");
                    }
                }
            }
        }
    }

    /// One cycle: claim stale rows and re-enrich them.
    ///
    /// The `SKIP LOCKED` select keeps concurrent sweepers apart while the
    /// transaction is open; after commit, the guarded `-> enriching`
    /// transition inside [`Orchestrator::reenrich`] is the real claim.
    async fn sweep(&self, stale_after_secs: i64) -> Result<(), sqlx::Error> {
        let cutoff = Utc::now() - chrono::Duration::seconds(stale_after_secs);

        let pool = self.orchestrator.pool().clone();
        let mut tx = pool.begin().await?;
        let stale = NotificationRepo::get_stale_pending(&mut tx, cutoff, BATCH_SIZE).await?;
        tx.commit().await?;

        if stale.is_empty() {
            return Ok(());
        }

        tracing::info!(count = stale.len(), "Recovering stranded pending notifications");
        for notif in &stale {
            self.orchestrator.reenrich(notif).await;
        }
        Ok(())
    }
}
