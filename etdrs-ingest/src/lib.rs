//! etdrs-ingest library interface
//!
//! Turns a directory of instrument reports into one aggregate table of
//! side-prefixed sector values per subject.

pub mod error;
pub mod models;
pub mod profile;
pub mod report;
pub mod services;

pub use crate::error::{IngestError, IngestResult};
pub use crate::profile::{ExtractionProfile, ProfileKind, Quantity};
pub use crate::services::{Aggregator, IngestRun, IngestSettings};

use crate::models::IngestReport;
use crate::services::FileScanner;
use std::path::Path;
use tracing::info;

/// Scan `input` and aggregate every report in sorted file order
pub fn ingest_directory(input: &Path, settings: IngestSettings) -> IngestResult<IngestRun> {
    let files = FileScanner::new().scan(input)?;
    info!(
        "Ingesting {} report(s) from {} with the {} profile",
        files.len(),
        input.display(),
        settings.profile.kind
    );
    Ok(Aggregator::new(settings).ingest_all(&files))
}

/// Write the aggregate table and, when requested, the JSON run report
pub fn write_outputs(run: &IngestRun, output: &Path, report: Option<&Path>) -> IngestResult<()> {
    run.table
        .write_csv(output)
        .map_err(|source| IngestError::Write {
            path: output.to_path_buf(),
            source,
        })?;
    info!("Wrote {} subject(s) to {}", run.table.len(), output.display());

    if let Some(path) = report {
        let body = IngestReport {
            summary: &run.summary,
            audit: &run.audit,
        };
        let json = serde_json::to_string_pretty(&body).map_err(|e| IngestError::Write {
            path: path.to_path_buf(),
            source: etdrs_common::Error::Internal(e.to_string()),
        })?;
        std::fs::write(path, json).map_err(|e| IngestError::Write {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        info!("Run report: {}", path.display());
    }
    Ok(())
}
