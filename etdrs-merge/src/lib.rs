//! etdrs-merge library
//!
//! Table-level stages that run after ingestion: cross-table merge, noise
//! masking and error map expansion.

pub mod error;
pub mod error_map;
pub mod mask;
pub mod merger;

pub use crate::error::{MergeError, MergeResult};
pub use crate::error_map::{
    combine_codes, error_proportions, expand_error_map, DigitSet, ErrorProportions,
};
pub use crate::mask::{MaskOutcome, MaskReport, NoiseMask};
pub use crate::merger::{merge_tables, resolve_cell, MergeOutcome, MergeStats};

use etdrs_common::table::{replace_duplicate, SubjectRecord};
use etdrs_common::text::TextLoader;
use etdrs_common::{AggregateTable, SubjectId};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Read a required input table keyed by `id_column`
pub fn read_table(path: &Path, loader: &TextLoader, id_column: &str) -> MergeResult<AggregateTable> {
    read_table_with(path, loader, id_column, replace_duplicate)
}

/// Read a required input table, folding repeated identifiers with `on_duplicate`
pub fn read_table_with<F>(
    path: &Path,
    loader: &TextLoader,
    id_column: &str,
    on_duplicate: F,
) -> MergeResult<AggregateTable>
where
    F: FnMut(&SubjectId, &mut SubjectRecord, SubjectRecord),
{
    if !path.is_file() {
        return Err(MergeError::MissingInput(path.to_path_buf()));
    }
    let table = AggregateTable::read_csv_with(path, loader, id_column, on_duplicate).map_err(|source| {
        MergeError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(
        "Loaded {} subject(s) x {} column(s) from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Write a stage output table
pub fn write_table(table: &AggregateTable, path: &Path) -> MergeResult<()> {
    table.write_csv(path).map_err(|source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {} subject(s) to {}", table.len(), path.display());
    Ok(())
}

/// Write any serializable stage report as pretty JSON
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> MergeResult<()> {
    let write_err = |source: etdrs_common::Error| MergeError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| write_err(etdrs_common::Error::Internal(e.to_string())))?;
    std::fs::write(path, json).map_err(|e| write_err(e.into()))?;
    Ok(())
}
