use rusqlite::ffi;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error that is not a recognised constraint violation.
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected a row (or a referenced row) but found none.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let classified = match &err {
            rusqlite::Error::QueryReturnedNoRows => Some(StoreError::NotFound),
            rusqlite::Error::SqliteFailure(failure, message) => match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(StoreError::Conflict(
                        message
                            .clone()
                            .unwrap_or_else(|| "duplicate record".to_string()),
                    ))
                }
                // A dangling reference means the row the caller named does not exist.
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(StoreError::NotFound),
                _ => None,
            },
            _ => None,
        };
        classified.unwrap_or(StoreError::Sqlite(err))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
