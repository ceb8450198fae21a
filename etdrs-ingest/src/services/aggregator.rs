//! Per-file aggregator
//!
//! Each report yields one candidate row keyed by the identifier derived from
//! its file name. Candidate rows are folded into a single aggregate table in
//! the directory's sorted file order. When two files name the same subject,
//! cells are combined under the configured [`FillPolicy`]; a missing cell
//! never erases a value.
//!
//! A report that cannot be read is logged, recorded in the run summary and
//! dropped; the run continues with the next file.

use crate::error::{IngestError, IngestResult};
use crate::models::{IngestIssue, IngestSummary};
use crate::profile::{ExtractionProfile, Placement};
use crate::report::{EyeSideResolver, SectorReadings, SectorTableExtractor};
use etdrs_common::config::{FillPolicy, TomlConfig};
use etdrs_common::table::SubjectRecord;
use etdrs_common::text::TextLoader;
use etdrs_common::{
    AggregateTable, Cell, ColumnSet, ColumnStyle, IdAudit, IdClass, IdentifierPolicy, Sector, Side,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything one aggregation pass needs to know
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub profile: ExtractionProfile,
    pub style: ColumnStyle,
    pub ids: IdentifierPolicy,
    pub fill: FillPolicy,
    pub id_column: String,
    pub encodings: Vec<String>,
}

impl IngestSettings {
    pub fn from_config(
        config: &TomlConfig,
        profile: ExtractionProfile,
    ) -> etdrs_common::Result<Self> {
        Ok(Self {
            profile,
            style: config.column_style()?,
            ids: config.identifier_policy(),
            fill: config.fill_policy,
            id_column: config.id_column.clone(),
            encodings: config.encodings.clone(),
        })
    }
}

/// Candidate row built from one report
#[derive(Debug, Clone)]
pub struct CandidateRow {
    /// Source file name
    pub source: String,
    pub class: IdClass,
    pub record: SubjectRecord,
}

/// Outcome of a whole pass
#[derive(Debug)]
pub struct IngestRun {
    pub table: AggregateTable,
    pub audit: IdAudit,
    pub summary: IngestSummary,
}

/// Accumulator threaded through one pass over the file list
pub struct Aggregator {
    settings: IngestSettings,
    loader: TextLoader,
    extractor: SectorTableExtractor,
    eye: EyeSideResolver,
    table: AggregateTable,
    audit: IdAudit,
    summary: IngestSummary,
}

impl Aggregator {
    pub fn new(settings: IngestSettings) -> Self {
        let columns: ColumnSet = settings.style.sector_columns().into_iter().collect();
        Self {
            loader: TextLoader::new(settings.encodings.clone()),
            extractor: SectorTableExtractor::new(settings.profile.layout.clone()),
            eye: EyeSideResolver::new(settings.profile.eye_mode()),
            table: AggregateTable::new(settings.id_column.clone(), columns),
            audit: IdAudit::default(),
            summary: IngestSummary::new(),
            settings,
        }
    }

    /// Read one report and build its candidate row
    pub fn read_report(&self, path: &Path) -> IngestResult<CandidateRow> {
        let rows = self
            .loader
            .read_rows(path)
            .map_err(|source| IngestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let source = file_name(path);
        let class = self
            .settings
            .ids
            .classify(&self.settings.ids.raw_from_filename(&source));
        let record = self.build_record(&rows, &source);
        Ok(CandidateRow {
            source,
            class,
            record,
        })
    }

    /// Side-prefixed cells for one report's rows
    pub fn build_record(&self, rows: &[Vec<String>], source: &str) -> SubjectRecord {
        let readings = self.extractor.extract(rows);
        if !readings.section_found() {
            warn!(
                "{}: section {} not found",
                source, self.settings.profile.layout.tag.tag
            );
        }
        let scan = self.eye.scan(rows);

        let mut record = SubjectRecord::new();
        match self.settings.profile.placement {
            Placement::PerSide { right, left } => {
                for (side, slot) in [(Side::Right, right), (Side::Left, left)] {
                    if scan.presence.has(side) {
                        self.place(&mut record, &readings, side, slot);
                    }
                }
            }
            Placement::ResolvedSide { slot } => match scan.first {
                Some(side) => self.place(&mut record, &readings, side, slot),
                None => warn!("{}: no eye side found, row left empty", source),
            },
        }
        debug!(
            "{}: {} cell(s) populated (halt: {:?})",
            source,
            record.populated(),
            scan.halt
        );
        record
    }

    fn place(&self, record: &mut SubjectRecord, readings: &SectorReadings, side: Side, slot: usize) {
        for sector in Sector::ALL {
            if let Some(value) = readings.get(sector, slot) {
                record.set(self.settings.style.sector_column(side, sector), Cell::number(value));
            }
        }
    }

    /// Fold a candidate row into the aggregate
    pub fn absorb(&mut self, row: CandidateRow) {
        self.audit.record(&row.class, &row.source);
        let Some(id) = row.class.subject().cloned() else {
            let message = match &row.class {
                IdClass::Rejected { raw, reason } => {
                    format!("identifier {:?} rejected ({:?})", raw, reason)
                }
                other => format!("identifier rejected ({:?})", other),
            };
            warn!("{}: {}, file excluded", row.source, message);
            self.summary
                .push_issue(IngestIssue::skip(row.source, "REJECTED_ID", message));
            return;
        };

        if self.table.contains(&id) {
            self.summary.repeated_subjects += 1;
            debug!("{}: combining with earlier row for {}", row.source, id);
        }
        combine(self.table.record_mut(&id), row.record, self.settings.fill);
        self.summary.files_processed += 1;
    }

    /// Read and absorb one file, isolating its failure
    pub fn ingest_file(&mut self, path: &Path) {
        match self.read_report(path) {
            Ok(row) => self.absorb(row),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                self.summary
                    .push_issue(IngestIssue::failed(file_name(path), e.code(), e.to_string()));
            }
        }
    }

    /// Run the pass over `files` in the given order
    pub fn ingest_all(mut self, files: &[PathBuf]) -> IngestRun {
        let started = Instant::now();
        self.summary.total_files = files.len();
        for path in files {
            self.ingest_file(path);
        }
        self.table.sort_by_id();
        self.summary.subjects = self.table.len();
        self.summary.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "Ingested {} of {} file(s) into {} subject(s); {} skipped",
            self.summary.files_processed,
            self.summary.total_files,
            self.summary.subjects,
            self.summary.files_skipped
        );
        IngestRun {
            table: self.table,
            audit: self.audit,
            summary: self.summary,
        }
    }
}

/// Combine `incoming` into `existing` cell by cell
pub fn combine(existing: &mut SubjectRecord, incoming: SubjectRecord, fill: FillPolicy) {
    for (column, cell) in incoming.iter() {
        if cell.is_missing() {
            continue;
        }
        let replace = match fill {
            FillPolicy::PreferLatest => true,
            FillPolicy::KeepFirst => existing.get(column).is_missing(),
        };
        if replace {
            existing.set(column, cell.clone());
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
