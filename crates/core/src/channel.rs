//! Delivery channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A delivery medium for a notification.
///
/// Serialized in lowercase both in JSON bodies and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Push,
}

impl Channel {
    /// The canonical lowercase string form (`"email"`, `"push"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }

    /// The broker routing key for this channel (`notification.<channel>`).
    pub fn routing_key(&self) -> String {
        format!("notification.{}", self.as_str())
    }

    /// The durable per-channel queue consumed by the channel workers.
    pub fn queue_name(&self) -> &'static str {
        match self {
            Channel::Email => "email_queue",
            Channel::Push => "push_queue",
        }
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "push" => Ok(Channel::Push),
            other => Err(CoreError::Validation(format!(
                "unknown notification channel: {other}"
            ))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_keys_follow_grammar() {
        assert_eq!(Channel::Email.routing_key(), "notification.email");
        assert_eq!(Channel::Push.routing_key(), "notification.push");
    }

    #[test]
    fn parses_known_channels() {
        assert_eq!("email".parse::<Channel>().unwrap(), Channel::Email);
        assert_eq!("push".parse::<Channel>().unwrap(), Channel::Push);
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!("sms".parse::<Channel>().is_err());
        assert!("EMAIL".parse::<Channel>().is_err());
    }

    #[test]
    fn json_form_is_lowercase() {
        let json = serde_json::to_string(&Channel::Push).unwrap();
        assert_eq!(json, "\"push\"");
    }
}
