//! Error types for Peerview services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! Validation failures carry every field-level message and are surfaced to
//! the client verbatim. Everything else that maps to a 5xx is normalized to
//! a generic body; the detail stays in the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFile,
    MissingFields,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,

    // Resource errors (4xxx)
    NotFound,
    SubmissionNotFound,
    UserNotFound,

    // Conflict errors (5xxx)
    DuplicateUser,

    // External service errors (8xxx)
    StorageError,
    MailError,

    // Internal errors (9xxx)
    DatabaseError,
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFile => 1002,
            ErrorCode::MissingFields => 1003,

            // Authn (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::SubmissionNotFound => 4002,
            ErrorCode::UserNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::DuplicateUser => 5001,

            // External (8xxx)
            ErrorCode::StorageError => 8001,
            ErrorCode::MailError => 8002,

            // Internal (9xxx)
            ErrorCode::DatabaseError => 9001,
            ErrorCode::InternalError => 9002,
            ErrorCode::ConfigurationError => 9003,
            ErrorCode::SerializationError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {}", messages.join("; "))]
    Validation { messages: Vec<String> },

    #[error("{message}")]
    InvalidFile { message: String },

    #[error("{message}")]
    MissingFields { message: String },

    // Authentication errors
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Token is not valid")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    // Authorization errors
    #[error("{message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Journal not found")]
    SubmissionNotFound,

    #[error("User not found")]
    UserNotFound,

    // Conflict errors
    #[error("User already exists")]
    DuplicateUser,

    // External service errors
    #[error("Storage provider error: {message}")]
    Storage { message: String },

    #[error("Mail provider error: {message}")]
    Mail { message: String },

    // Internal errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFile { .. } => ErrorCode::InvalidFile,
            AppError::MissingFields { .. } => ErrorCode::MissingFields,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::SubmissionNotFound => ErrorCode::SubmissionNotFound,
            AppError::UserNotFound => ErrorCode::UserNotFound,
            AppError::DuplicateUser => ErrorCode::DuplicateUser,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Mail { .. } => ErrorCode::MailError,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::HttpClient(_) => ErrorCode::InternalError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidFile { .. }
            | AppError::MissingFields { .. }
            | AppError::DuplicateUser => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidToken
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::SubmissionNotFound | AppError::UserNotFound => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Storage { .. }
            | AppError::Mail { .. }
            | AppError::Database(_)
            | AppError::HttpClient(_)
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// The message body the client is allowed to see.
    ///
    /// Client errors are surfaced verbatim (validation as the full message
    /// list). Server errors collapse to a fixed body so provider error
    /// bodies and stack detail never leave the process.
    pub fn client_message(&self) -> ErrorMessage {
        match self {
            AppError::Validation { messages } => ErrorMessage::Many(messages.clone()),
            AppError::Storage { .. } => {
                ErrorMessage::One("Failed to upload file to cloud storage".to_string())
            }
            _ if self.is_server_error() => ErrorMessage::One("Server error".to_string()),
            _ => ErrorMessage::One(self.to_string()),
        }
    }
}

/// Error payload: a single message, or the aggregated validation messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

/// Structured error response for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorMessage,
    pub code: ErrorCode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: self.client_message(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::SubmissionNotFound;
        assert_eq!(err.code(), ErrorCode::SubmissionNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error_aggregates() {
        let err = AppError::Validation {
            messages: vec![
                "Please provide at least one author".into(),
                "Abstract must be at least 50 characters".into(),
            ],
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());

        match err.client_message() {
            ErrorMessage::Many(messages) => assert_eq!(messages.len(), 2),
            other => panic!("expected aggregated messages, got {:?}", other),
        }
    }

    #[test]
    fn test_server_error_body_is_generic() {
        let err = AppError::Internal {
            message: "connection pool exhausted at 0x7f".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert_eq!(
            err.client_message(),
            ErrorMessage::One("Server error".to_string())
        );
    }

    #[test]
    fn test_storage_error_body_never_leaks_provider_detail() {
        let err = AppError::Storage {
            message: "provider returned 503: upstream maintenance".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.client_message(),
            ErrorMessage::One("Failed to upload file to cloud storage".to_string())
        );
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ExpiredToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ExpiredToken.code(), ErrorCode::ExpiredToken);
    }
}
