//! Chainbook error types

use thiserror::Error;

/// Chainbook error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal; reported before any stage runs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream source error (the source is treated as absent for the run)
    #[error("Source error: {0}")]
    Source(String),

    /// Record shape error (the record is dropped, the stage continues)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Transient I/O error that survived its retry budget
    #[error("Transient error: {0}")]
    Transient(String),

    /// Remote object-store error
    #[error("Remote store error: {0}")]
    Remote(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chainbook operations
pub type Result<T> = std::result::Result<T, Error>;
