//! Error types for etdrs-merge

use std::path::PathBuf;
use thiserror::Error;

/// Table stage error type
#[derive(Debug, Error)]
pub enum MergeError {
    /// Required input table missing; the stage cannot start
    #[error("Input table not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Input table could not be read or has no identifier column
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: etdrs_common::Error,
    },

    /// Output table could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: etdrs_common::Error,
    },

    /// etdrs-common error
    #[error("Common error: {0}")]
    Common(#[from] etdrs_common::Error),
}

/// Result type for table stages
pub type MergeResult<T> = Result<T, MergeError>;
