use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::Serialize;
use serde_json::json;

/// Error type shared by all services.
///
/// Every operation boundary converts failures into one of these variants so
/// the HTTP layer can always render a response; nothing panics across a
/// handler. `NotFound` is deliberately distinct from `DatabaseError` so the
/// caller can show a terminal message instead of a retry prompt.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Sequence unavailable: {0}")]
    SequenceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) | ServiceError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::SequenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_label(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "Not Found",
            ServiceError::ValidationError(_) | ServiceError::InvalidInput(_) => "Bad Request",
            ServiceError::InvalidOperation(_) => "Unprocessable Entity",
            ServiceError::Conflict(_) => "Conflict",
            ServiceError::ExternalApiError(_) => "Bad Gateway",
            ServiceError::SequenceUnavailable(_) => "Service Unavailable",
            _ => "Internal Server Error",
        }
    }
}

/// JSON body returned for any failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Root-cause detail for 5xx stays in the logs, not the response body.
        let message = match &self {
            ServiceError::DatabaseError(e) => {
                tracing::error!("database error: {}", e);
                "An internal error occurred".to_string()
            }
            ServiceError::InternalError(msg) => {
                tracing::error!("internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!(ErrorResponse {
            error: self.error_label().to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ServiceError::NotFound("Order 42 not found".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_label(), "Not Found");
    }

    #[test]
    fn validation_maps_to_400() {
        let err = ServiceError::ValidationError("email is malformed".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_error_is_masked_in_response() {
        let err = ServiceError::DatabaseError(DbErr::Custom("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn sequence_unavailable_maps_to_503() {
        let err = ServiceError::SequenceUnavailable("orders counter".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
