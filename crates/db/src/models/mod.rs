//! Row models and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert DTO used by the repositories.

pub mod event;
pub mod notification;
