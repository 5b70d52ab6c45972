//! Audit event types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of an append-only audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Enriched,
    Queued,
    Sent,
    Delivered,
    Failed,
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
    Cancelled,
    Retried,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Enriched => "enriched",
            EventType::Queued => "queued",
            EventType::Sent => "sent",
            EventType::Delivered => "delivered",
            EventType::Failed => "failed",
            EventType::Opened => "opened",
            EventType::Clicked => "clicked",
            EventType::Bounced => "bounced",
            EventType::Unsubscribed => "unsubscribed",
            EventType::Cancelled => "cancelled",
            EventType::Retried => "retried",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
