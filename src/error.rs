use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Claim race loser. Expected under contention, not exceptional; the
    /// caller should refresh its pending-orders view.
    #[error("order already assigned to another driver")]
    AlreadyAssigned,

    #[error("order is not assigned to this driver")]
    NotAssignedToCaller,

    #[error("latitude and longitude are required")]
    MissingCoordinates,

    #[error("location accuracy too low")]
    LowAccuracy,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code carried next to the human message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyAssigned => "ORDER_ALREADY_ASSIGNED",
            AppError::NotAssignedToCaller => "NOT_ASSIGNED_TO_CALLER",
            AppError::MissingCoordinates => "MISSING_LOCATION",
            AppError::LowAccuracy => "LOW_ACCURACY",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::MissingCoordinates | AppError::LowAccuracy => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyAssigned => StatusCode::CONFLICT,
            AppError::NotAssignedToCaller => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code()
        }));

        (status, body).into_response()
    }
}
