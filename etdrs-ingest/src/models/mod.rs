//! Data models

pub mod ingest_result;

pub use ingest_result::{IngestIssue, IngestReport, IngestSummary, IssueSeverity};
