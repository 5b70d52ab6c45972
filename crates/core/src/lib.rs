//! Shared domain vocabulary for the notification platform.
//!
//! This crate defines the types every other crate agrees on:
//!
//! - [`Channel`], [`Priority`], [`NotificationStatus`], [`EventType`] -- the
//!   closed enumerations of the data model, with their wire/database string
//!   forms.
//! - [`NotificationStatus::can_transition_to`] -- the status state machine.
//! - [`ErrorCode`] -- the stored failure taxonomy.
//! - [`CoreError`] -- the domain-level error type.

pub mod channel;
pub mod error;
pub mod event_type;
pub mod priority;
pub mod status;
pub mod types;

pub use channel::Channel;
pub use error::{CoreError, ErrorCode};
pub use event_type::EventType;
pub use priority::Priority;
pub use status::NotificationStatus;
pub use types::Timestamp;
