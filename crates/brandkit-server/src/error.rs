use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use brandkit_core::error::{AppError, UpstreamReason};

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::InvalidInput(_) | AppError::SerializationError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Upstream { reason, .. } => match reason {
            UpstreamReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
            UpstreamReason::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        AppError::RenderFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "Request failed");
        }

        let body = ErrorResponse {
            error: self.0.kind().to_string(),
            reason: self.0.upstream_reason().map(|r| r.as_str().to_string()),
            message: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
