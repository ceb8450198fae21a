//! Ingestion services

pub mod aggregator;
pub mod file_scanner;

pub use aggregator::{combine, Aggregator, CandidateRow, IngestRun, IngestSettings};
pub use file_scanner::{FileScanner, ScanError};
