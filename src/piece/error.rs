use thiserror::Error;

/// Condition reported to callers, independent of the underlying cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A record with the same identity is already stored
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::NotFound(_) => ErrorCode::NotFound,
            RegistryError::Validation(_) | RegistryError::AlreadyExists(_) => {
                ErrorCode::Validation
            }
            RegistryError::Internal(_)
            | RegistryError::Database(_)
            | RegistryError::Serialization(_)
            | RegistryError::LockPoisoned => ErrorCode::Internal,
        }
    }
}
