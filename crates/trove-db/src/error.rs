//! Error types for database operations

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Unique key violation, e.g. an asset code that already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored record could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a store-level uniqueness violation
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey(_))
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        match err {
            native_db::db_type::Error::DuplicateKey { key_name } => {
                Error::DuplicateKey(key_name.to_string())
            }
            other => Error::Database(other.to_string()),
        }
    }
}

impl From<trove_core::Error> for Error {
    fn from(err: trove_core::Error) -> Self {
        Error::Corrupt(err.to_string())
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
