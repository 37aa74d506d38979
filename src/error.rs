//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::booking::responses::BookingErrorResponse;
use crate::booking::services::BookingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Booking(e) => match e {
                BookingError::InvalidRange { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_range")
                }
                BookingError::QuantityOutOfRange { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "quantity_out_of_range")
                }
                BookingError::UnsupportedResource { .. } => {
                    (StatusCode::NOT_FOUND, "unsupported_resource")
                }
                BookingError::InsufficientCapacity { .. } => {
                    (StatusCode::CONFLICT, "insufficient_capacity")
                }
                BookingError::Configuration { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
                }
                BookingError::DataAccess { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "data_access_error")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        // Server-side failures are logged in full and reported generically.
        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            match &self {
                AppError::Database(_) => "Database error".to_string(),
                AppError::Booking(BookingError::Configuration { .. }) => {
                    "Configuration error".to_string()
                }
                AppError::Booking(BookingError::DataAccess { .. }) => {
                    "Data access error".to_string()
                }
                _ => "Internal error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = BookingErrorResponse {
            error_type: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
