//! Error types for the database layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database migration error: {0}")]
    Migration(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl DatabaseError {
    /// Map a unique constraint violation to `Conflict`, keeping other errors as query errors.
    pub fn from_unique(error: sqlx::Error, message: impl Into<String>) -> Self {
        let is_unique = error
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);

        if is_unique {
            DatabaseError::Conflict(message.into())
        } else {
            DatabaseError::Query(error)
        }
    }
}
