//! Notification priorities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Delivery priority attached to every notification.
///
/// The HTTP boundary accepts the numeric form (1 = low .. 4 = urgent);
/// everywhere else the lowercase name is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Parse the numeric request form.
    pub fn from_request(value: i64) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Normal),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Urgent),
            other => Err(CoreError::Validation(format!(
                "priority must be between 1 and 4, got {other}"
            ))),
        }
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(CoreError::Validation(format!(
                "unknown priority: {other}"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_request_form_maps_in_order() {
        assert_eq!(Priority::from_request(1).unwrap(), Priority::Low);
        assert_eq!(Priority::from_request(2).unwrap(), Priority::Normal);
        assert_eq!(Priority::from_request(3).unwrap(), Priority::High);
        assert_eq!(Priority::from_request(4).unwrap(), Priority::Urgent);
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        assert!(Priority::from_request(0).is_err());
        assert!(Priority::from_request(5).is_err());
        assert!(Priority::from_request(-1).is_err());
    }

    #[test]
    fn string_form_round_trips() {
        for priority in [Priority::Low, Priority::Normal, Priority::High, Priority::Urgent] {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
    }

    #[test]
    fn priorities_order_by_urgency() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }
}
