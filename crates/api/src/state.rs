use std::sync::Arc;

use courier_cache::CacheGateway;
use courier_db::DbPool;
use courier_orchestrator::Orchestrator;

use crate::config::Config;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Cache gateway (idempotency admission, status snapshots).
    pub cache: CacheGateway,
    /// The enrichment service; handlers hand accepted requests to it on
    /// detached tasks.
    pub orchestrator: Arc<Orchestrator>,
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
}
