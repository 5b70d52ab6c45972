//! Repository for the partitioned `notifications` table.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use courier_core::types::Timestamp;
use courier_core::{ErrorCode, NotificationStatus};

use crate::models::notification::{NewNotification, Notification, NotificationStats};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, template_code, correlation_id, idempotency_key, \
     channel, status, priority, variables, metadata, enriched_payload, \
     enriched_at, queued_at, sent_at, delivered_at, failed_at, \
     error_code, error_message, retry_count, max_retries, \
     provider, provider_message_id, created_at, updated_at, deleted_at";

/// Provides CRUD and state transitions for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a new notification in `pending`.
    ///
    /// A second row with the same live idempotency key violates the unique
    /// index; callers detect that with
    /// [`is_unique_violation`](crate::is_unique_violation) and load the
    /// existing row instead.
    pub async fn create(pool: &PgPool, notif: &NewNotification) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notifications ( \
                id, user_id, template_code, correlation_id, idempotency_key, \
                channel, status, priority, variables, metadata, retry_count, max_retries \
             ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, 0, $10)",
        )
        .bind(notif.id)
        .bind(&notif.user_id)
        .bind(&notif.template_code)
        .bind(&notif.correlation_id)
        .bind(&notif.idempotency_key)
        .bind(notif.channel.as_str())
        .bind(notif.priority.as_str())
        .bind(&notif.variables)
        .bind(&notif.metadata)
        .bind(notif.max_retries)
        .execute(pool)
        .await?;

        tracing::info!(
            notification_id = %notif.id,
            correlation_id = %notif.correlation_id,
            channel = %notif.channel,
            "Notification created"
        );
        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM notifications WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_correlation_id(
        pool: &PgPool,
        correlation_id: &str,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE correlation_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(correlation_id)
            .fetch_optional(pool)
            .await
    }

    /// Look up a notification by idempotency key within the 24-hour
    /// deduplication window. Absence is `None`, not an error.
    pub async fn get_by_idempotency_key(
        pool: &PgPool,
        key: &str,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE idempotency_key = $1 \
               AND created_at > NOW() - INTERVAL '24 hours' \
               AND deleted_at IS NULL \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Move a notification to `status`, writing the matching phase timestamp
    /// at most once (`COALESCE(col, NOW())`).
    ///
    /// The update only applies when the current status is a legal
    /// predecessor in the state machine, so an illegal transition (or a
    /// deleted/missing row) returns `false` without mutating anything.
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: NotificationStatus,
    ) -> Result<bool, sqlx::Error> {
        let allowed_from: Vec<&str> = NotificationStatus::ALL
            .iter()
            .filter(|from| from.can_transition_to(status))
            .map(|from| from.as_str())
            .collect();

        let query = match status.phase_timestamp_column() {
            Some(column) => format!(
                "UPDATE notifications \
                 SET status = $1, {column} = COALESCE({column}, NOW()), updated_at = NOW() \
                 WHERE id = $2 AND deleted_at IS NULL AND status = ANY($3)"
            ),
            None => "UPDATE notifications \
                 SET status = $1, updated_at = NOW() \
                 WHERE id = $2 AND deleted_at IS NULL AND status = ANY($3)"
                .to_string(),
        };

        let result = sqlx::query(&query)
            .bind(status.as_str())
            .bind(id)
            .bind(&allowed_from)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the enriched payload and stamp `enriched_at` (first write wins).
    /// Status is updated separately.
    pub async fn update_enriched_payload(
        pool: &PgPool,
        id: Uuid,
        payload: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET enriched_payload = $1, \
                 enriched_at = COALESCE(enriched_at, NOW()), \
                 updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(payload)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a terminal failure for this attempt: `status = 'failed'`,
    /// error code/message, incremented retry count, `failed_at` set once.
    pub async fn update_failure(
        pool: &PgPool,
        id: Uuid,
        code: ErrorCode,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET status = 'failed', \
                 error_code = $1, \
                 error_message = $2, \
                 retry_count = retry_count + 1, \
                 failed_at = COALESCE(failed_at, NOW()), \
                 updated_at = NOW() \
             WHERE id = $3 AND deleted_at IS NULL",
        )
        .bind(code.as_str())
        .bind(message)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Select failed notifications eligible for another attempt, most urgent
    /// first. Rows are locked with `SKIP LOCKED` so concurrent sweepers never
    /// claim the same row; run this inside a transaction.
    pub async fn get_failed_for_retry(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = 'failed' \
               AND retry_count < max_retries \
               AND failed_at > NOW() - INTERVAL '24 hours' \
               AND deleted_at IS NULL \
             ORDER BY CASE priority \
                 WHEN 'urgent' THEN 4 WHEN 'high' THEN 3 WHEN 'normal' THEN 2 ELSE 1 \
               END DESC, created_at ASC \
             LIMIT $1 \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    /// Select `pending` rows created before `cutoff` -- work that was accepted
    /// but whose enrichment task never completed. Locked with `SKIP LOCKED`
    /// for the same reason as [`get_failed_for_retry`].
    pub async fn get_stale_pending(
        conn: &mut PgConnection,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = 'pending' \
               AND created_at < $1 \
               AND deleted_at IS NULL \
             ORDER BY created_at ASC \
             LIMIT $2 \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    /// Keyset-paginated listing of a user's notifications, newest first.
    ///
    /// Returns the page plus the cursor for the next one; a short page means
    /// there is no next page.
    pub async fn get_user_notifications_with_cursor(
        pool: &PgPool,
        user_id: &str,
        limit: i64,
        cursor: Option<Timestamp>,
    ) -> Result<(Vec<Notification>, Option<Timestamp>), sqlx::Error> {
        let rows = match cursor {
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM notifications \
                     WHERE user_id = $1 AND deleted_at IS NULL \
                     ORDER BY created_at DESC \
                     LIMIT $2"
                );
                sqlx::query_as::<_, Notification>(&query)
                    .bind(user_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
            }
            Some(cursor) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM notifications \
                     WHERE user_id = $1 AND created_at < $2 AND deleted_at IS NULL \
                     ORDER BY created_at DESC \
                     LIMIT $3"
                );
                sqlx::query_as::<_, Notification>(&query)
                    .bind(user_id)
                    .bind(cursor)
                    .bind(limit)
                    .fetch_all(pool)
                    .await?
            }
        };

        let next_cursor = if (rows.len() as i64) < limit {
            None
        } else {
            rows.last().map(|n| n.created_at)
        };
        Ok((rows, next_cursor))
    }

    /// Per-day/channel/status counts with average time from creation to
    /// provider hand-off.
    pub async fn get_stats_by_date_range(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<NotificationStats>, sqlx::Error> {
        sqlx::query_as::<_, NotificationStats>(
            "SELECT \
                date_trunc('day', created_at) AS date, \
                channel, \
                status, \
                COUNT(*) AS count, \
                AVG(EXTRACT(EPOCH FROM (COALESCE(sent_at, NOW()) - created_at)))::float8 \
                    AS avg_processing_seconds \
             FROM notifications \
             WHERE created_at BETWEEN $1 AND $2 AND deleted_at IS NULL \
             GROUP BY date_trunc('day', created_at), channel, status \
             ORDER BY date DESC, channel, status",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Soft-delete a notification. Returns `false` when the row is missing
    /// or already deleted.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
