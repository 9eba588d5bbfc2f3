use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::ItemId;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed the field constraints on `ItemInput`.
    #[error("{0}")]
    Validation(String),

    /// Body missing, not JSON, or of the wrong shape.
    #[error("{0}")]
    BadRequest(String),

    /// Path id that is not a non-negative integer.
    #[error("{0}")]
    BadIdentifier(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to update item, ID: {0}")]
    UpdateFailed(ItemId),

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::BadIdentifier(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpdateFailed(_) | AppError::Database(_) | AppError::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        // Driver errors go out verbatim; nothing is redacted here.
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
