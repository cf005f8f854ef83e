use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;
use crate::blob_store::BlobStoreError;
use crate::storage::DatabaseError;

/// Domain failures shared by the storage, sharing and upload layers.
/// Each variant maps to one HTTP status in the API layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Gone(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn gone(message: impl Into<String>) -> Self {
        AppError::Gone(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

impl From<DatabaseError> for AppError {
    fn from(e: DatabaseError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<BlobStoreError> for AppError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::NotFound(_) => AppError::not_found("File content not found"),
            _ => AppError::Internal(format!("Blob store error: {e}")),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort | PasswordError::TooLong => AppError::Validation(e.to_string()),
            PasswordError::VerificationFailed => AppError::forbidden("Incorrect password"),
            PasswordError::HashError(_) | PasswordError::InvalidHash => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encode(_) => AppError::Internal(e.to_string()),
            TokenError::Invalid(_) | TokenError::WrongType => {
                AppError::unauthorized("Invalid or expired token")
            }
        }
    }
}
