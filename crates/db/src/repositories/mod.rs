//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept `&PgPool` as the first argument. Methods that rely on row locks
//! (`FOR UPDATE SKIP LOCKED`) take `&mut PgConnection` instead so callers
//! can scope them inside a transaction.

pub mod event_repo;
pub mod notification_repo;

pub use event_repo::NotificationEventRepo;
pub use notification_repo::NotificationRepo;
