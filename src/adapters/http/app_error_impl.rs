use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "Internal server error",
            ),
            AppError::InvalidCredentials => error_resp(
                StatusCode::UNAUTHORIZED,
                ErrorCode::InvalidCredentials,
                "Invalid credentials",
            ),
            AppError::InvalidSignature(_) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidSignature,
                "Invalid signature",
            ),
            AppError::RateLimited => error_resp(
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimited,
                "Too many requests",
            ),
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, msg)
            }
            AppError::SetupNotVerified(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::SetupNotVerified, msg)
            }
            AppError::BillingIdentityConflict(_) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::BillingIdentityConflict,
                "Billing identity mismatch",
            ),
            AppError::VersionConflict => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::VersionConflict,
                "Please retry",
            ),
            AppError::Provider(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ProviderError,
                "Billing provider unavailable",
            ),
            AppError::NotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not found")
            }
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Internal server error",
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "code": code.as_str(), "error": message.into() });
    (status, Json(body)).into_response()
}
