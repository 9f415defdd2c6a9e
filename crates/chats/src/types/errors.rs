//! Error types for the chat system.

use courier_database::DatabaseError;
use thiserror::Error;

use crate::media::MediaError;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Chat not found: {id}")]
    ChatNotFound { id: String },

    #[error("Media upload failed: {message}")]
    UpstreamMedia { message: String },

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ChatError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for chats
    pub fn chat_not_found(id: impl Into<String>) -> Self {
        Self::ChatNotFound { id: id.into() }
    }

    /// Create an upstream media error
    pub fn upstream_media(message: impl Into<String>) -> Self {
        Self::UpstreamMedia {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<DatabaseError> for ChatError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ValidationError(message) => Self::Validation { message },
            other => Self::Database(other),
        }
    }
}

impl From<MediaError> for ChatError {
    fn from(error: MediaError) -> Self {
        Self::upstream_media(error.to_string())
    }
}
