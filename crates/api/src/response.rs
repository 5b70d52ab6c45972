//! The standard response envelope.
//!
//! Every orchestrator response is wrapped in
//! `{success, data, error, message, meta}` so callers can handle success
//! and failure uniformly.

use serde::Serialize;

/// Offset-pagination metadata, attached when a listing is page-based.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub limit: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Standard envelope wrapping every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub message: String,
    pub meta: Option<PaginationMeta>,
}

impl ApiResponse {
    pub fn success(data: serde_json::Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: message.into(),
            meta: None,
        }
    }

    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: message.into(),
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let envelope = ApiResponse::success(serde_json::json!({"x": 1}), "ok");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["x"], 1);
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["message"], "ok");
        assert_eq!(json["meta"], serde_json::Value::Null);
    }

    #[test]
    fn failure_envelope_shape() {
        let envelope = ApiResponse::failure("boom", "Invalid request body");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["error"], "boom");
        assert_eq!(json["message"], "Invalid request body");
    }

    #[test]
    fn meta_serializes_all_fields() {
        let envelope = ApiResponse {
            success: true,
            data: Some(serde_json::json!([])),
            error: None,
            message: "ok".to_string(),
            meta: Some(PaginationMeta {
                total: 42,
                limit: 10,
                page: 2,
                total_pages: 5,
                has_next: true,
                has_previous: true,
            }),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["meta"]["total"], 42);
        assert_eq!(json["meta"]["total_pages"], 5);
        assert_eq!(json["meta"]["has_previous"], true);
    }
}
