//! Common error types for the ETDRS tools

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for ETDRS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ingest and merge tools
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited table read or write error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required input path does not exist
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid user input or table structure
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
