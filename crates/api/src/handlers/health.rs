//! Liveness and readiness checks.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use crate::state::AppState;

/// Budget for each dependency ping.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /health
///
/// Pings the database and Redis, each under a 5-second budget, and reports
/// per-dependency status. Any failing dependency flips the overall status
/// to `unhealthy` and the response to 503.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let db = check("database", courier_db::health_check(&state.pool)).await;
    let redis = check("redis", state.cache.ping()).await;

    let healthy = db.healthy && redis.healthy;
    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "timestamp": Utc::now(),
        "checks": {
            "database": db.into_json(),
            "redis": redis.into_json(),
        },
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

struct CheckResult {
    healthy: bool,
    response_time: Duration,
    error: Option<String>,
}

impl CheckResult {
    fn into_json(self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "status": if self.healthy { "healthy" } else { "unhealthy" },
            "response_time": format!("{:?}", self.response_time),
        });
        if let Some(error) = self.error {
            json["error"] = serde_json::Value::String(error);
        }
        json
    }
}

async fn check<E: std::fmt::Display>(
    name: &str,
    ping: impl std::future::Future<Output = Result<(), E>>,
) -> CheckResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(CHECK_TIMEOUT, ping).await;
    let response_time = started.elapsed();

    match outcome {
        Ok(Ok(())) => {
            tracing::debug!(check = name, ?response_time, "Health check passed");
            CheckResult {
                healthy: true,
                response_time,
                error: None,
            }
        }
        Ok(Err(e)) => {
            tracing::error!(check = name, ?response_time, error = %e, "Health check failed");
            CheckResult {
                healthy: false,
                response_time,
                error: Some(e.to_string()),
            }
        }
        Err(_) => {
            tracing::error!(check = name, ?response_time, "Health check timed out");
            CheckResult {
                healthy: false,
                response_time,
                error: Some("ping timed out".to_string()),
            }
        }
    }
}
