//! Error types for trove-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid asset code format: {0}")]
    InvalidFormat(String),

    #[error("Invalid characters in code: {0}")]
    InvalidCharacter(String),

    #[error("The check digit was invalid. Expected {expected}")]
    InvalidCheckDigit { expected: char },

    #[error("Invalid asset code prefix: {0}")]
    InvalidPrefix(String),

    #[error("Asset code must be at least one character long")]
    EmptyCode,

    #[error("{0} is not a valid asset code type")]
    UnknownCodeType(String),

    #[error("{0} is not a valid asset state")]
    UnknownAssetState(String),

    #[error("{0} is not a valid node type")]
    UnknownNodeType(String),

    #[error("{0} is not a valid event type")]
    UnknownEventType(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
