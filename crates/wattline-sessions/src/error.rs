use thiserror::Error;

/// Errors that can occur during session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested session does not exist in the database.
    #[error("session not found: {id}")]
    NotFound { id: String },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The record cannot be persisted as given.
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
