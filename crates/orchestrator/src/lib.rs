//! The orchestrator service: enrichment, publishing, and the background
//! sweepers that keep stalled work moving.
//!
//! The [`service::Orchestrator`] drives an accepted request through
//! `pending → enriching → queued`, recording one audit event per transition
//! and snapshotting the outcome to the cache. [`recovery::PendingRecovery`]
//! re-runs enrichment for rows whose detached task died before finishing;
//! [`retry::FailedRetry`] re-drives failed rows that still have retry
//! budget.

pub mod recovery;
pub mod retry;
pub mod service;

pub use service::{EnrichmentRequest, Orchestrator};
