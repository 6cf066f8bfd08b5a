use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use passgate_core::error::{AuthError, CodeError, Error, TokenError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// One message for a wrong password and an unknown address.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Not found")]
    NotFound,

    #[error("Too many failed attempts, try again later")]
    Locked,

    #[error("Internal server error")]
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(AuthError::InvalidCredentials) => ApiError::InvalidCredentials,
            Error::Auth(AuthError::AccountInactive) => ApiError::Forbidden("Account is inactive"),
            Error::Auth(AuthError::EmailNotConfirmed) => {
                ApiError::Forbidden("Email address has not been confirmed")
            }
            Error::Auth(AuthError::EmailAlreadyConfirmed) => {
                ApiError::Conflict("Email address is already confirmed")
            }
            Error::Auth(AuthError::AlreadyRegistered) => {
                ApiError::Conflict("Registration is already complete")
            }
            Error::Auth(AuthError::UserNotFound) => ApiError::NotFound,
            Error::Code(CodeError::Invalid) => {
                ApiError::BadRequest("Invalid verification code".to_string())
            }
            Error::Code(CodeError::Expired) => {
                ApiError::BadRequest("Verification code has expired".to_string())
            }
            Error::Code(CodeError::Locked) => ApiError::Locked,
            Error::Token(TokenError::Invalid) => ApiError::Unauthorized,
            Error::Validation(e) => ApiError::BadRequest(e.to_string()),
            // Unexpected failures: full detail stays in the log, the caller
            // gets an opaque generic message.
            other => {
                tracing::error!(error = %other, "internal error");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Locked => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
