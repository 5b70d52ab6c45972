//! Handlers for the `/notification` ingest and status resources.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use courier_cache::Admission;
use courier_core::types::Timestamp;
use courier_core::{Channel, CoreError, Priority};
use courier_db::repositories::NotificationRepo;
use courier_orchestrator::EnrichmentRequest;

use crate::error::{AppError, AppResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Maximum page size for the per-user listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for the per-user listing.
const DEFAULT_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

/// Body of `POST /notification`.
#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub notification_type: String,
    pub user_id: String,
    pub template_code: String,
    #[serde(default)]
    pub variables: serde_json::Value,
    pub request_id: String,
    pub priority: i64,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Query parameters for `GET /users/{user_id}/notifications`.
#[derive(Debug, Deserialize)]
pub struct CursorQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Keyset cursor: the `created_at` of the last row of the previous page.
    pub cursor: Option<Timestamp>,
}

/// Validate the request body and resolve the typed channel and priority.
fn validate(body: &NotificationRequest) -> Result<(Channel, Priority), AppError> {
    for (field, value) in [
        ("notification_type", &body.notification_type),
        ("user_id", &body.user_id),
        ("template_code", &body.template_code),
        ("request_id", &body.request_id),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} must not be empty")));
        }
    }
    if body.variables.is_null() {
        return Err(AppError::BadRequest("variables must be present".to_string()));
    }

    let channel: Channel = body
        .notification_type
        .parse()
        .map_err(|e: CoreError| AppError::BadRequest(e.to_string()))?;
    let priority = Priority::from_request(body.priority)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok((channel, priority))
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

/// POST /notification
///
/// Validates, admits the idempotency key, hands the request to the
/// orchestrator on a detached task, and acks with `202`. A duplicate key
/// short-circuits with `200` and the original correlation id.
pub async fn create_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NotificationRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) =
        payload.map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?;
    let (channel, priority) = validate(&body)?;

    let idempotency_key = headers
        .get("x-idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing X-Idempotency-Key header".to_string()))?
        .to_string();

    let correlation_id = headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Cache admission is the fast path; the datastore's unique index is the
    // authoritative deduplication point.
    match state
        .cache
        .admit_idempotency_key(&idempotency_key, &correlation_id)
        .await?
    {
        Admission::Duplicate(existing) => {
            tracing::info!(idempotency_key = %idempotency_key, "Duplicate request detected");
            Ok((
                StatusCode::OK,
                Json(ApiResponse::success(
                    serde_json::json!({
                        "correlation_id": existing,
                        "idempotency_key": idempotency_key,
                    }),
                    "Duplicate request detected",
                )),
            )
                .into_response())
        }
        Admission::Admitted => {
            let request = EnrichmentRequest {
                user_id: body.user_id,
                template_code: body.template_code,
                channel,
                priority,
                variables: body.variables,
                metadata: body.metadata.unwrap_or_else(|| serde_json::json!({})),
                correlation_id: correlation_id.clone(),
                idempotency_key: idempotency_key.clone(),
            };

            // Fire and forget: the response never waits for enrichment. The
            // pending-recovery sweeper picks the row back up if this task
            // dies mid-flight.
            let orchestrator = Arc::clone(&state.orchestrator);
            tokio::spawn(async move {
                orchestrator.enrich_and_publish(request).await;
            });

            Ok((
                StatusCode::ACCEPTED,
                Json(ApiResponse::success(
                    serde_json::json!({
                        "correlation_id": correlation_id,
                        "idempotency_key": idempotency_key,
                        "status": "processing",
                    }),
                    "Notification accepted and being processed",
                )),
            )
                .into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Status lookup
// ---------------------------------------------------------------------------

/// GET /notification/{correlation_id}
///
/// Returns the cached status snapshot when present, falling back to the
/// datastore row. 404 when the correlation id is unknown to both.
pub async fn get_notification_status(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> AppResult<Json<ApiResponse>> {
    match state.cache.get_status_snapshot(&correlation_id).await {
        Ok(Some(snapshot)) => {
            return Ok(Json(ApiResponse::success(
                serde_json::json!({
                    "correlation_id": correlation_id,
                    "status": snapshot.status,
                    "error": snapshot.error,
                    "updated_at": snapshot.updated_at,
                }),
                "Notification status",
            )));
        }
        Ok(None) => {}
        // A cache outage degrades to the datastore lookup.
        Err(e) => tracing::warn!(error = %e, "Status snapshot lookup failed"),
    }

    let row = NotificationRepo::get_by_correlation_id(&state.pool, &correlation_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Notification",
            id: correlation_id.clone(),
        })?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({
            "correlation_id": correlation_id,
            "status": row.status,
            "error": row.error_message,
            "updated_at": row.updated_at.timestamp(),
        }),
        "Notification status",
    )))
}

// ---------------------------------------------------------------------------
// Per-user listing
// ---------------------------------------------------------------------------

/// GET /users/{user_id}/notifications
///
/// Keyset-paginated listing, newest first. The response carries the cursor
/// for the next page; its absence means the listing is exhausted.
pub async fn list_user_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<CursorQuery>,
) -> AppResult<Json<ApiResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let (notifications, next_cursor) =
        NotificationRepo::get_user_notifications_with_cursor(&state.pool, &user_id, limit, params.cursor)
            .await?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({
            "notifications": notifications,
            "next_cursor": next_cursor,
        }),
        "User notifications",
    )))
}
