use thiserror::Error;

use crate::domain::CardId;

pub type Result<T> = std::result::Result<T, BoardError>;

/// Coarse classification of a [`BoardError`], used to pick a status code and
/// to decide whether the message may be shown to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied data violates a field or request-shape constraint.
    Validation,
    /// The referenced card does not exist.
    NotFound,
    /// Storage failure, lock timeout, or transaction conflict.
    Persistence,
    /// Bad configuration file or environment; raised at startup only.
    Configuration,
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{0}")]
    Validation(String),

    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    #[error("background task failed: {0}")]
    TaskJoin(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BoardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CardNotFound(_) => ErrorKind::NotFound,
            Self::Sqlite(_) | Self::Migration { .. } | Self::TaskJoin(_) | Self::IoError(_) => {
                ErrorKind::Persistence
            }
            Self::ConfigError(_) => ErrorKind::Configuration,
        }
    }
}

impl From<tokio::task::JoinError> for BoardError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BoardError::validation("Title is required.").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            BoardError::CardNotFound(CardId::new(7)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BoardError::from(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_config_errors_are_not_caller_errors() {
        let err = BoardError::ConfigError("invalid PORT: x".to_string());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_ne!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = BoardError::validation("Invalid lane.");
        assert_eq!(err.to_string(), "Invalid lane.");
    }
}
