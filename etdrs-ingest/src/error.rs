//! Error types for etdrs-ingest

use crate::services::file_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Ingestion error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// A single report could not be read; the run continues
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: etdrs_common::Error,
    },

    /// Input directory problem; the run cannot start
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Writing the aggregate failed
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

impl IngestError {
    /// Short code used in the run summary
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Read { .. } => "READ_ERROR",
            IngestError::Scan(_) => "SCAN_ERROR",
            IngestError::Write { .. } => "WRITE_ERROR",
            IngestError::Common(_) => "COMMON_ERROR",
        }
    }
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;
