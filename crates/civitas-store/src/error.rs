use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error other than a constraint violation.
    #[error("Database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// A UNIQUE / CHECK / FOREIGN KEY constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Date arithmetic left chrono's representable range.
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// JSON column (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored enumeration or identifier did not parse.
    #[error("Stored value error: {0}")]
    Parse(#[from] civitas_shared::ParseError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Sqlite(other),
        }
    }
}

impl StoreError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
