//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`EntlError`] classes to HTTP status codes and returns JSON bodies
//! with a machine-readable code, a message and optional details.
//! Internal error details never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use entl_core::EntlError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced record does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Invariant violation or malformed field (422).
    #[error("{0}")]
    Validation(String),

    /// Request body or query could not be parsed (422).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Collides with existing state (409).
    #[error("{0}")]
    Conflict(String),

    /// Illegal subscription lifecycle transition (409).
    #[error("{0}")]
    InvalidState(String),

    /// Resolution of a single-role module that has no role (409).
    #[error("module {module_id} has no role assignment in plan {plan_id}")]
    NotConfigured { plan_id: String, module_id: String },

    /// Internal server error (500). Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::NotConfigured { .. } => (StatusCode::CONFLICT, "NOT_CONFIGURED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotConfigured { plan_id, module_id } => Some(serde_json::json!({
                "plan_id": plan_id,
                "module_id": module_id,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EntlError> for AppError {
    fn from(err: EntlError) -> Self {
        match err {
            EntlError::NotFound { .. } => Self::NotFound(err.to_string()),
            EntlError::Validation(msg) => Self::Validation(msg),
            EntlError::Conflict(msg) => Self::Conflict(msg),
            EntlError::InvalidState(msg) => Self::InvalidState(msg),
            EntlError::NotConfigured { plan_id, module_id } => {
                Self::NotConfigured { plan_id, module_id }
            }
            EntlError::Persistence(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_core::EntityKind;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn entl_errors_map_to_status_codes() {
        let cases = [
            (EntlError::not_found(EntityKind::Plan, "PLN-9"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (EntlError::validation("x"), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (EntlError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (EntlError::InvalidState("x".into()), StatusCode::CONFLICT, "INVALID_STATE"),
            (
                EntlError::NotConfigured {
                    plan_id: "PLN-004".into(),
                    module_id: "finance".into(),
                },
                StatusCode::CONFLICT,
                "NOT_CONFIGURED",
            ),
            (
                EntlError::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status_and_code(), (status, code));
        }
    }

    #[test]
    fn bad_request_is_unprocessable() {
        let (status, code) = AppError::BadRequest("x".into()).status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = body_json(AppError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("disk"));
    }

    #[tokio::test]
    async fn not_configured_carries_details() {
        let err = AppError::from(EntlError::NotConfigured {
            plan_id: "PLN-004".into(),
            module_id: "finance".into(),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["details"]["module_id"], "finance");
        assert!(body["error"].get("details").is_some());
    }

    #[tokio::test]
    async fn not_found_message_names_the_record() {
        let err = AppError::from(EntlError::not_found(EntityKind::Subscription, "sub_9"));
        let (_, body) = body_json(err).await;
        assert_eq!(body["error"]["message"], "subscription sub_9 not found");
        assert!(body["error"].get("details").is_none());
    }
}
