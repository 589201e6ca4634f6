//! Error types for the authentication service

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Per-field validation messages, keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'techpredictor-auth init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Token encoding error: {0}")]
    TokenEncoding(String),

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("No active account found for the given token.")]
    InactiveTokenUser,

    #[error("Token is invalid or expired")]
    TokenInvalid,

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("JSON parse error - {0}")]
    MalformedBody(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("A user with that username already exists.")]
    UsernameTaken,

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Validation error carrying a single message for one field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Error::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials
            | Error::InactiveTokenUser
            | Error::TokenInvalid
            | Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::MalformedBody(_) | Error::Validation(_) | Error::UsernameTaken => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("Background task failed: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Error::Validation(errors) => json!(errors),
            Error::UsernameTaken => json!({ "username": [Error::UsernameTaken.to_string()] }),
            Error::TokenInvalid => json!({
                "detail": Error::TokenInvalid.to_string(),
                "code": "token_not_valid",
            }),
            other if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed: {}", other);
                json!({ "detail": "Internal server error" })
            }
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_unauthorized() {
        assert_eq!(Error::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::PermissionDenied.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let response = Error::Config("secret missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_field_error_shape() {
        match Error::field("password", "too short") {
            Error::Validation(errors) => {
                assert_eq!(errors.get("password").unwrap(), &vec!["too short".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
