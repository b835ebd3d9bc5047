//! Error types for the Tessera credential engine.

use thiserror::Error;

/// Coarse failure category, stable across crates.
///
/// Callers decide on retries and on how much detail to surface from the
/// kind alone; the variant payloads are for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    InvalidInput,
    InvalidCredential,
    Transient,
    Fatal,
}

#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with the same {field}")]
    AlreadyExists { entity: String, field: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{reason}")]
    InvalidCredential { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TesseraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TesseraError::NotFound { .. } => ErrorKind::NotFound,
            TesseraError::AlreadyExists { .. } | TesseraError::Conflict { .. } => {
                ErrorKind::Conflict
            }
            TesseraError::Forbidden { .. } => ErrorKind::Forbidden,
            TesseraError::Validation { .. } => ErrorKind::InvalidInput,
            TesseraError::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            TesseraError::Database(_) => ErrorKind::Transient,
            TesseraError::Crypto(_)
            | TesseraError::Configuration(_)
            | TesseraError::Internal(_) => ErrorKind::Fatal,
        }
    }

    /// Whether the caller may safely retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        TesseraError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, field: &str) -> Self {
        TesseraError::AlreadyExists {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TesseraError::NotFound { .. })
    }
}

pub type TesseraResult<T> = Result<T, TesseraError>;
