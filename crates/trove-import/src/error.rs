//! Error types for trove-import

use thiserror::Error;

/// Import error type
#[derive(Debug, Error)]
pub enum Error {
    /// A dataset file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A timestamp in the dataset could not be read.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Engine error
    #[error("engine error: {0}")]
    Engine(#[from] trove_engine::Error),

    /// Database error
    #[error("database error: {0}")]
    Db(#[from] trove_db::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for import operations
pub type Result<T> = std::result::Result<T, Error>;
