//! Database-specific error types and conversions.

use tessera_core::error::TesseraError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl From<DbError> for TesseraError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TesseraError::NotFound { entity, id },
            DbError::Conflict(reason) => TesseraError::Conflict { reason },
            // Unique index violations surface from SurrealDB as query errors.
            DbError::Surreal(e) if e.to_string().contains("already contains") => {
                TesseraError::Conflict {
                    reason: e.to_string(),
                }
            }
            other => TesseraError::Database(other.to_string()),
        }
    }
}

/// Parse a UUID stored as a string column.
pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

