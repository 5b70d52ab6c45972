//! Cache gateway: idempotency admission and status snapshots in Redis.
//!
//! Two key families, both with a 24-hour TTL:
//!
//! - `idempotency:{key}` → correlation id, written with set-if-absent
//!   semantics. The fast path of request deduplication; the datastore's
//!   unique index remains authoritative.
//! - `notification:status:{correlation_id}` → JSON snapshot
//!   `{status, error, updated_at}`, overwritten on each transition so
//!   callers can poll the asynchronous outcome.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// TTL shared by both key families.
const TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("invalid snapshot payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of an idempotency admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The key was unseen; this request owns it for the TTL window.
    Admitted,
    /// Another request holds the key; its correlation id is returned.
    Duplicate(String),
}

/// Point-in-time status of a notification, keyed by correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix seconds of the last transition.
    pub updated_at: i64,
}

/// Pooled async connection to Redis. Cheap to clone.
///
/// Construction validates the address but performs no I/O; the managed
/// connection is established on first use. Startup wiring calls
/// [`ping`](Self::ping) to fail fast on an unreachable server.
#[derive(Clone)]
pub struct CacheGateway {
    client: redis::Client,
    manager: Arc<OnceCell<ConnectionManager>>,
}

impl CacheGateway {
    pub fn new(address: &str, password: &str, db: i64) -> Result<Self, CacheError> {
        let url = if password.is_empty() {
            format!("redis://{address}/{db}")
        } else {
            format!("redis://:{password}@{address}/{db}")
        };
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
        })
    }

    /// The shared reconnecting connection, established on first use.
    async fn conn(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                self.client
                    .get_connection_manager()
                    .await
                    .map_err(CacheError::from)
            })
            .await?;
        Ok(manager.clone())
    }

    /// Verify Redis answers a PING.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Atomically claim an idempotency key (`SET NX EX`).
    ///
    /// When a concurrent request wins the race the stored correlation id is
    /// fetched and returned, so callers can fall back to the duplicate path.
    pub async fn admit_idempotency_key(
        &self,
        key: &str,
        correlation_id: &str,
    ) -> Result<Admission, CacheError> {
        let mut conn = self.conn().await?;
        let cache_key = idempotency_key(key);

        let set: Option<String> = redis::cmd("SET")
            .arg(&cache_key)
            .arg(correlation_id)
            .arg("NX")
            .arg("EX")
            .arg(TTL_SECS)
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            return Ok(Admission::Admitted);
        }

        // Lost the race; the winner's correlation id is already stored. If
        // the key expired in between, treat the request as admitted anyway:
        // the datastore's unique index settles it.
        match conn.get::<_, Option<String>>(&cache_key).await? {
            Some(existing) => Ok(Admission::Duplicate(existing)),
            None => Ok(Admission::Admitted),
        }
    }

    /// Overwrite the status snapshot for a correlation id.
    pub async fn put_status_snapshot(
        &self,
        correlation_id: &str,
        snapshot: &StatusSnapshot,
    ) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(status_key(correlation_id), payload, TTL_SECS)
            .await?;
        Ok(())
    }

    /// Read the status snapshot for a correlation id, if present.
    pub async fn get_status_snapshot(
        &self,
        correlation_id: &str,
    ) -> Result<Option<StatusSnapshot>, CacheError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(status_key(correlation_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

fn idempotency_key(key: &str) -> String {
    format!("idempotency:{key}")
}

fn status_key(correlation_id: &str) -> String {
    format!("notification:status:{correlation_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_families_have_stable_prefixes() {
        assert_eq!(idempotency_key("k1"), "idempotency:k1");
        assert_eq!(
            status_key("8b9d2c"),
            "notification:status:8b9d2c"
        );
    }

    #[test]
    fn construction_performs_no_io() {
        // Port 1 is never a Redis server; only operations should fail.
        assert!(CacheGateway::new("127.0.0.1:1", "", 0).is_ok());
        assert!(CacheGateway::new("127.0.0.1:1", "secret", 3).is_ok());
    }

    #[test]
    fn snapshot_omits_error_when_absent() {
        let snapshot = StatusSnapshot {
            status: "queued".to_string(),
            error: None,
            updated_at: 1_700_000_000,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["updated_at"], 1_700_000_000);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn snapshot_round_trips_with_error() {
        let snapshot = StatusSnapshot {
            status: "failed".to_string(),
            error: Some("template inactive".to_string()),
            updated_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, "failed");
        assert_eq!(back.error.as_deref(), Some("template inactive"));
    }
}
