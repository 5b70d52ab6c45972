//! Notification lifecycle states and the transition table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a notification.
///
/// The allowed transitions form a strict state machine; use
/// [`can_transition_to`](NotificationStatus::can_transition_to) before
/// mutating a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Enriching,
    Queued,
    Processing,
    Sent,
    Delivered,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [NotificationStatus; 8] = [
        NotificationStatus::Pending,
        NotificationStatus::Enriching,
        NotificationStatus::Queued,
        NotificationStatus::Processing,
        NotificationStatus::Sent,
        NotificationStatus::Delivered,
        NotificationStatus::Failed,
        NotificationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Enriching => "enriching",
            NotificationStatus::Queued => "queued",
            NotificationStatus::Processing => "processing",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this state admits no further transitions (other than none).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Delivered
                | NotificationStatus::Failed
                | NotificationStatus::Cancelled
        )
    }

    /// The status transition table.
    ///
    /// `failed -> enriching` is the explicit-retry edge; any non-terminal
    /// state may be cancelled.
    pub fn can_transition_to(&self, to: NotificationStatus) -> bool {
        use NotificationStatus::*;

        if to == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, to),
            (Pending, Enriching)
                | (Pending, Failed)
                | (Enriching, Failed)
                | (Enriching, Queued)
                | (Queued, Processing)
                | (Processing, Sent)
                | (Processing, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Failed, Enriching)
        )
    }

    /// The phase-timestamp column written (first-write-wins) when a row
    /// enters this state, if any. Entering `enriching` sets no timestamp;
    /// `enriched_at` is only written together with the enriched payload.
    pub fn phase_timestamp_column(&self) -> Option<&'static str> {
        match self {
            NotificationStatus::Queued => Some("queued_at"),
            NotificationStatus::Sent => Some("sent_at"),
            NotificationStatus::Delivered => Some("delivered_at"),
            NotificationStatus::Failed => Some("failed_at"),
            _ => None,
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "enriching" => Ok(NotificationStatus::Enriching),
            "queued" => Ok(NotificationStatus::Queued),
            "processing" => Ok(NotificationStatus::Processing),
            "sent" => Ok(NotificationStatus::Sent),
            "delivered" => Ok(NotificationStatus::Delivered),
            "failed" => Ok(NotificationStatus::Failed),
            "cancelled" => Ok(NotificationStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "unknown notification status: {other}"
            ))),
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
