//! Error types for Casemail

use thiserror::Error;

/// Main error type for Casemail
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Casemail
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Database(_) => 500,
            Error::Decode(_) => 500,
            Error::Smtp(_) => 500,
            Error::Auth(_) => 401,
            Error::Validation(_) => 422,
            Error::NotFound(_) => 404,
            Error::PermissionDenied(_) => 403,
            Error::Internal(_) => 500,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Decode(_) => "DECODING_ERROR",
            Error::Smtp(_) => "SMTP_ERROR",
            Error::Auth(_) => "UNAUTHORIZED",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::PermissionDenied(_) => "FORBIDDEN",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
