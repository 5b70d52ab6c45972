//! Notification audit event model.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use courier_core::types::Timestamp;

/// A row from the append-only `notification_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub correlation_id: String,
    pub event_type: String,
    pub channel: Option<String>,
    pub event_data: serde_json::Value,
    pub provider: Option<String>,
    pub provider_message_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub event_at: Timestamp,
}

/// Insert DTO for an audit event.
#[derive(Debug, Clone)]
pub struct NewNotificationEvent {
    pub notification_id: Uuid,
    pub correlation_id: String,
    pub event_type: String,
    pub channel: Option<String>,
    pub event_data: serde_json::Value,
    pub provider: Option<String>,
    pub provider_message_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
