//! Integration tests for `NotificationEventRepo`.

use sqlx::PgPool;
use uuid::Uuid;

use courier_core::{Channel, EventType, Priority};
use courier_db::models::notification::NewNotification;
use courier_db::repositories::{NotificationEventRepo, NotificationRepo};

async fn seeded_notification(pool: &PgPool, key: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let correlation_id = Uuid::new_v4().to_string();
    let notif = NewNotification {
        id,
        user_id: "u-1".to_string(),
        template_code: "t-1".to_string(),
        correlation_id: correlation_id.clone(),
        idempotency_key: key.to_string(),
        channel: Channel::Push,
        priority: Priority::High,
        variables: serde_json::json!({}),
        metadata: serde_json::json!({}),
        max_retries: 3,
    };
    NotificationRepo::create(pool, &notif).await.unwrap();
    (id, correlation_id)
}

#[sqlx::test]
async fn events_append_and_list_in_order(pool: PgPool) {
    let (id, correlation_id) = seeded_notification(&pool, "k-ev-order").await;

    for event_type in [EventType::Created, EventType::Enriched, EventType::Queued] {
        NotificationEventRepo::create_simple(
            &pool,
            id,
            &correlation_id,
            event_type,
            Some(Channel::Push),
            serde_json::json!({}),
        )
        .await
        .unwrap();
    }

    let events = NotificationEventRepo::list_by_notification(&pool, id).await.unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["created", "enriched", "queued"]);
}

#[sqlx::test]
async fn events_are_reachable_by_correlation_id(pool: PgPool) {
    let (id, correlation_id) = seeded_notification(&pool, "k-ev-corr").await;

    NotificationEventRepo::create_simple(
        &pool,
        id,
        &correlation_id,
        EventType::Failed,
        Some(Channel::Push),
        serde_json::json!({"error": "remote unavailable", "stage": "user_fetch"}),
    )
    .await
    .unwrap();

    let events = NotificationEventRepo::list_by_correlation(&pool, &correlation_id)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "failed");
    assert_eq!(events[0].event_data["stage"], "user_fetch");
    assert_eq!(events[0].channel.as_deref(), Some("push"));
}

#[sqlx::test]
async fn unknown_event_type_is_rejected_by_schema(pool: PgPool) {
    let (id, correlation_id) = seeded_notification(&pool, "k-ev-bad").await;

    let result = sqlx::query(
        "INSERT INTO notification_events (id, notification_id, correlation_id, event_type) \
         VALUES ($1, $2, $3, 'exploded')",
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(&correlation_id)
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
