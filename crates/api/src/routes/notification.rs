use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Mount the notification ingest, status, and listing routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notification", post(notification::create_notification))
        .route(
            "/notification/{correlation_id}",
            get(notification::get_notification_status),
        )
        .route(
            "/users/{user_id}/notifications",
            get(notification::list_user_notifications),
        )
}
