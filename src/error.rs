use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ErrorResponse;

/// Reasons a request is treated as unauthenticated. Each maps to 401.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,
    #[error("Authorization header format must be Bearer {{token}}")]
    MalformedHeader,
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    /// Shared by unknown usernames and wrong passwords.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid old password")]
    InvalidOldPassword,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for AppError {
    fn from(error: libsql::Error) -> Self {
        AppError::Storage(error.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        AppError::validation("Invalid request body")
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected path parameter");
        AppError::validation("Invalid ID")
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected multipart request");
        AppError::validation("Failed to parse form")
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        tracing::debug!(error = %error, "failed to read multipart field");
        AppError::validation("Failed to parse form")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!(error = %format!("{e:#}"), "storage failure");
                "Internal server error".to_string()
            }
            AppError::Auth(e) => {
                tracing::warn!(reason = %crate::unpack_error(e), "request not authenticated");
                e.to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorResponse { error: message })).into_response()
    }
}
