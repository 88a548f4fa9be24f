use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docvault_core::VersioningError;
use serde_json::json;

/// API error type rendered as a JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Versioning(#[from] VersioningError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Versioning(err) => match err {
                VersioningError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "notFound", err.to_string())
                }
                VersioningError::InvariantViolation(_) => {
                    tracing::warn!("Rejected write: {err}");
                    (StatusCode::CONFLICT, "conflict", err.to_string())
                }
                VersioningError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "validation", err.to_string())
                }
                VersioningError::Persistence(_) => {
                    tracing::error!("Store error: {err}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "unavailable",
                        "The document store is unavailable; retry later".to_string(),
                    )
                }
                VersioningError::Serialization(_) => {
                    tracing::error!("Internal error: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internalError",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
