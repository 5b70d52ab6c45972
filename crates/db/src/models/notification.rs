//! Notification entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use courier_core::types::Timestamp;
use courier_core::{Channel, CoreError, NotificationStatus, Priority};

/// A row from the partitioned `notifications` table.
///
/// `channel`, `status`, and `priority` are stored as their lowercase string
/// forms; use the `parsed_*` accessors to get the typed enums back.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub template_code: String,
    pub correlation_id: String,
    pub idempotency_key: String,
    pub channel: String,
    pub status: String,
    pub priority: String,
    pub variables: serde_json::Value,
    pub metadata: serde_json::Value,
    pub enriched_payload: Option<serde_json::Value>,
    pub enriched_at: Option<Timestamp>,
    pub queued_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub provider: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Notification {
    pub fn parsed_channel(&self) -> Result<Channel, CoreError> {
        self.channel.parse()
    }

    pub fn parsed_status(&self) -> Result<NotificationStatus, CoreError> {
        self.status.parse()
    }

    pub fn parsed_priority(&self) -> Result<Priority, CoreError> {
        self.priority.parse()
    }
}

/// Insert DTO for a new notification.
///
/// Rows always start in `pending` with a zero retry count; the remaining
/// columns default in the schema.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: String,
    pub template_code: String,
    pub correlation_id: String,
    pub idempotency_key: String,
    pub channel: Channel,
    pub priority: Priority,
    pub variables: serde_json::Value,
    pub metadata: serde_json::Value,
    pub max_retries: i32,
}

/// One bucket of the per-day/channel/status statistics rollup.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationStats {
    pub date: Timestamp,
    pub channel: String,
    pub status: String,
    pub count: i64,
    pub avg_processing_seconds: Option<f64>,
}
