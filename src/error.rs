//! drive-privacy error types

use thiserror::Error;

/// drive-privacy error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown column, bad weight table)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input table does not match the schema an operation requires
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid parameter passed to an operation (e.g. non-positive epsilon)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for drive-privacy operations
pub type Result<T> = std::result::Result<T, Error>;
