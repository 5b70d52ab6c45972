//! Repository for the append-only `notification_events` table.

use sqlx::PgPool;
use uuid::Uuid;

use courier_core::{Channel, EventType};

use crate::models::event::{NewNotificationEvent, NotificationEvent};

/// Column list for `notification_events` queries.
const COLUMNS: &str = "id, notification_id, correlation_id, event_type, channel, event_data, \
     provider, provider_message_id, user_agent, ip_address, event_at";

/// Append and read audit events. Events are immutable once written.
pub struct NotificationEventRepo;

impl NotificationEventRepo {
    /// Append a fully-populated event row.
    pub async fn create(pool: &PgPool, event: &NewNotificationEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_events ( \
                id, notification_id, correlation_id, event_type, channel, event_data, \
                provider, provider_message_id, user_agent, ip_address \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(event.notification_id)
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(&event.channel)
        .bind(&event.event_data)
        .bind(&event.provider)
        .bind(&event.provider_message_id)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append an event carrying only the fields the orchestrator knows.
    pub async fn create_simple(
        pool: &PgPool,
        notification_id: Uuid,
        correlation_id: &str,
        event_type: EventType,
        channel: Option<Channel>,
        event_data: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        let event = NewNotificationEvent {
            notification_id,
            correlation_id: correlation_id.to_string(),
            event_type: event_type.as_str().to_string(),
            channel: channel.map(|c| c.as_str().to_string()),
            event_data,
            provider: None,
            provider_message_id: None,
            user_agent: None,
            ip_address: None,
        };
        Self::create(pool, &event).await
    }

    pub async fn list_by_notification(
        pool: &PgPool,
        notification_id: Uuid,
    ) -> Result<Vec<NotificationEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_events \
             WHERE notification_id = $1 \
             ORDER BY event_at ASC"
        );
        sqlx::query_as::<_, NotificationEvent>(&query)
            .bind(notification_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_correlation(
        pool: &PgPool,
        correlation_id: &str,
    ) -> Result<Vec<NotificationEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_events \
             WHERE correlation_id = $1 \
             ORDER BY event_at ASC"
        );
        sqlx::query_as::<_, NotificationEvent>(&query)
            .bind(correlation_id)
            .fetch_all(pool)
            .await
    }
}
