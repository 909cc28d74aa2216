use axum::{http::StatusCode, response::IntoResponse, Json};
use hirewire_core::store::StoreError;
use hirewire_core::webhook::IntakeError;
use serde::Serialize;
use tracing::error;

use crate::state::RequestId;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal,
}

#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: String,
}

impl AppError {
    pub fn with_request_id(self, request_id: &RequestId) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.0.clone(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(msg) => AppError::BadRequest(msg),
            StoreError::Database(msg) => {
                error!(error = %msg, "store failure");
                AppError::Internal
            }
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            err @ IntakeError::NotAnObject => AppError::BadRequest(err.to_string()),
            IntakeError::UnknownEvent(id) => AppError::NotFound(format!("webhook event {id}")),
            IntakeError::Store(err) => err.into(),
        }
    }
}

/// Attach the request id while converting a domain error.
pub trait ResultExt<T> {
    fn for_request(self, request_id: &RequestId) -> ApiResult<T>;
}

impl<T, E: Into<AppError>> ResultExt<T> for Result<T, E> {
    fn for_request(self, request_id: &RequestId) -> ApiResult<T> {
        self.map_err(|err| err.into().with_request_id(request_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self.error {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Unexpected error".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody {
                    code: code.to_string(),
                    message,
                    request_id: self.request_id,
                },
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
