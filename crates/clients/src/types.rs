//! Wire types for the user-preference and template services.

use serde::{Deserialize, Serialize};

use courier_core::Channel;

/// The standard response envelope both remote services speak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl<T> ServiceResponse<T> {
    /// The error text to surface when `success` is false.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.message.clone())
    }
}

/// A user's delivery preferences as served by the user service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub email_opt_in: bool,
    pub push_opt_in: bool,
    pub daily_limit: i64,
    pub language: String,
}

impl UserPreferences {
    /// Whether the user has opted in to the given channel.
    pub fn allows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email_opt_in,
            Channel::Push => self.push_opt_in,
        }
    }
}

/// One version of a message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub version: i32,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub variables: serde_json::Value,
}

/// A message template as served by the template service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub event: String,
    pub channel: Vec<String>,
    #[serde(default)]
    pub language: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub versions: Vec<TemplateVersion>,
}

impl Template {
    /// Whether this template advertises a rendering for the channel.
    pub fn supports_channel(&self, channel: Channel) -> bool {
        self.channel.iter().any(|c| c == channel.as_str())
    }

    /// The highest-numbered version, which is the one the pipeline renders.
    pub fn latest_version(&self) -> Option<&TemplateVersion> {
        self.versions.iter().max_by_key(|v| v.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_json() -> serde_json::Value {
        serde_json::json!({
            "id": "t-1",
            "name": "welcome",
            "event": "user.signup",
            "channel": ["email", "push"],
            "language": "en",
            "isActive": true,
            "versions": [
                {"version": 1, "subject": "Hi", "title": "Hi", "body": "Hello {{name}}", "variables": {}},
                {"version": 3, "subject": "Hi v3", "title": "Hi", "body": "Hello {{name}}!", "variables": {}},
                {"version": 2, "subject": "Hi v2", "title": "Hi", "body": "Hello {{name}}.", "variables": {}}
            ]
        })
    }

    #[test]
    fn latest_version_picks_the_highest_number() {
        let template: Template = serde_json::from_value(template_json()).unwrap();
        assert_eq!(template.latest_version().unwrap().version, 3);
        assert_eq!(template.latest_version().unwrap().subject, "Hi v3");
    }

    #[test]
    fn latest_version_is_none_without_versions() {
        let mut json = template_json();
        json["versions"] = serde_json::json!([]);
        let template: Template = serde_json::from_value(json).unwrap();
        assert!(template.latest_version().is_none());
    }

    #[test]
    fn channel_support_matches_the_advertised_list() {
        let mut json = template_json();
        json["channel"] = serde_json::json!(["email"]);
        let template: Template = serde_json::from_value(json).unwrap();
        assert!(template.supports_channel(Channel::Email));
        assert!(!template.supports_channel(Channel::Push));
    }

    #[test]
    fn preferences_gate_by_channel() {
        let prefs = UserPreferences {
            email_opt_in: true,
            push_opt_in: false,
            daily_limit: 100,
            language: "en".to_string(),
        };
        assert!(prefs.allows(Channel::Email));
        assert!(!prefs.allows(Channel::Push));
    }

    #[test]
    fn envelope_error_text_prefers_error_over_message() {
        let envelope: ServiceResponse<UserPreferences> = serde_json::from_value(serde_json::json!({
            "success": false,
            "error": "user not found",
            "message": "Failed to load preferences"
        }))
        .unwrap();
        assert_eq!(envelope.error_text(), "user not found");

        let envelope: ServiceResponse<UserPreferences> = serde_json::from_value(serde_json::json!({
            "success": false,
            "message": "Failed to load preferences"
        }))
        .unwrap();
        assert_eq!(envelope.error_text(), "Failed to load preferences");
    }
}
