//! The wire document handed to per-channel workers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use courier_clients::{Template, UserPreferences};
use courier_core::types::Timestamp;
use courier_core::{Channel, Priority};

/// The message body published per `(notification, channel)`.
///
/// Carries everything a worker needs so it never calls back into the
/// orchestrator; `notification_id` makes redelivery idempotent on the
/// worker side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedNotification {
    pub notification_id: Uuid,
    pub correlation_id: String,
    pub idempotency_key: String,
    pub user_id: String,
    pub template_code: String,
    pub channel: Channel,
    pub priority: Priority,
    pub user_preferences: UserPreferences,
    pub template: Template,
    pub variables: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_clients::TemplateVersion;

    fn sample() -> EnrichedNotification {
        EnrichedNotification {
            notification_id: Uuid::nil(),
            correlation_id: "c-1".to_string(),
            idempotency_key: "k-1".to_string(),
            user_id: "u-1".to_string(),
            template_code: "t-1".to_string(),
            channel: Channel::Email,
            priority: Priority::Normal,
            user_preferences: UserPreferences {
                email_opt_in: true,
                push_opt_in: false,
                daily_limit: 100,
                language: "en".to_string(),
            },
            template: Template {
                id: "t-1".to_string(),
                name: "welcome".to_string(),
                event: "user.signup".to_string(),
                channel: vec!["email".to_string()],
                language: "en".to_string(),
                is_active: true,
                versions: vec![TemplateVersion {
                    version: 1,
                    subject: "Hi".to_string(),
                    title: "Hi".to_string(),
                    body: "Hello {{name}}".to_string(),
                    variables: serde_json::json!({}),
                }],
            },
            variables: serde_json::json!({"name": "A", "link": "https://x"}),
            metadata: serde_json::json!({}),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn wire_document_uses_snake_case_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        for field in [
            "notification_id",
            "correlation_id",
            "idempotency_key",
            "user_id",
            "template_code",
            "channel",
            "priority",
            "user_preferences",
            "template",
            "variables",
            "metadata",
            "created_at",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["channel"], "email");
        assert_eq!(json["priority"], "normal");
        assert_eq!(json["template"]["isActive"], true);
    }

    #[test]
    fn wire_document_round_trips() {
        let original = sample();
        let bytes = serde_json::to_vec(&original).unwrap();
        let back: EnrichedNotification = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.notification_id, original.notification_id);
        assert_eq!(back.channel, Channel::Email);
        assert_eq!(back.template.versions.len(), 1);
    }
}
