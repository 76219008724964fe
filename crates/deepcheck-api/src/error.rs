//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deepcheck_media::MediaError;
use deepcheck_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Analysis(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Analysis(e) if e.is_user_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(StorageError::InvalidUpload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Analysis(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let code = match &self {
            ApiError::Analysis(MediaError::NoMatchingModel { .. }) => Some("no_matching_model"),
            ApiError::Analysis(MediaError::InsufficientFrames { .. }) => Some("insufficient_frames"),
            _ => None,
        };

        let body = ErrorResponse {
            detail,
            code: code.map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_unprocessable() {
        let err = ApiError::from(MediaError::no_matching_model(7, "none"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(MediaError::InsufficientFrames {
            required: 40,
            available: 3,
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_model_load_is_server_fault() {
        let err = ApiError::from(MediaError::model_load("bad shape"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_upload_is_bad_request() {
        let err = ApiError::from(StorageError::invalid_upload("notes.txt"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
