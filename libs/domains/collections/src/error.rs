use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(Uuid),

    #[error("Operation not found: {0}")]
    OperationNotFound(Uuid),

    #[error("Invalid transfer request: {0}")]
    InvalidTransfer(String),

    #[error("Storage error: {0}")]
    Store(String),
}

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Convert CollectionError to AppError for standardized error responses
impl From<CollectionError> for AppError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::CollectionNotFound(id) => {
                AppError::NotFound(format!("Collection {} not found", id))
            }
            CollectionError::OperationNotFound(id) => {
                AppError::NotFound(format!("Operation {} not found", id))
            }
            CollectionError::InvalidTransfer(msg) => AppError::BadRequest(msg),
            CollectionError::Store(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CollectionError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
