//! Sector Table Extractor
//!
//! Reads the nine labelled sector rows below a section tag. Each requested
//! value column is selected either by fixed position or by the header cell
//! ending in a marker character (`R`/`L`). Sectors absent from the section
//! stay missing.

use super::section::{is_blank, is_section_boundary, locate, SectionTag};
use etdrs_common::text::{first_cell, parse_number};
use etdrs_common::Sector;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How a value column is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Fixed column position (0 is the label column)
    Fixed(usize),
    /// First header cell whose trimmed text ends with this character
    HeaderSuffix(char),
}

/// What a blank row inside the section means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankRowPolicy {
    /// Blank row ends the section
    Terminate,
    /// Blank row is stepped over
    Skip,
}

/// Layout of one sector table
#[derive(Debug, Clone)]
pub struct SectorTableLayout {
    pub tag: SectionTag,
    pub selectors: Vec<ColumnSelector>,
    pub blank_rows: BlankRowPolicy,
    /// Labels of rows that are neither sectors nor terminators
    pub skip_labels: &'static [&'static str],
}

impl SectorTableLayout {
    /// A header row follows the tag when any column is found by suffix
    fn has_header(&self) -> bool {
        self.selectors
            .iter()
            .any(|s| matches!(s, ColumnSelector::HeaderSuffix(_)))
    }
}

/// Values read from one section: sector → one slot per selector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorReadings {
    found: bool,
    values: BTreeMap<Sector, Vec<Option<f64>>>,
}

impl SectorReadings {
    /// Whether the section tag was present at all
    pub fn section_found(&self) -> bool {
        self.found
    }

    /// Value for `sector` from the selector at `slot`
    pub fn get(&self, sector: Sector, slot: usize) -> Option<f64> {
        self.values
            .get(&sector)
            .and_then(|slots| slots.get(slot).copied().flatten())
    }

    /// Sectors that had a row in the section
    pub fn sectors(&self) -> impl Iterator<Item = Sector> + '_ {
        self.values.keys().copied()
    }
}

/// Extractor bound to a table layout
#[derive(Debug, Clone)]
pub struct SectorTableExtractor {
    layout: SectorTableLayout,
}

impl SectorTableExtractor {
    pub fn new(layout: SectorTableLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SectorTableLayout {
        &self.layout
    }

    pub fn extract(&self, rows: &[Vec<String>]) -> SectorReadings {
        let Some(tag_idx) = locate(rows, &self.layout.tag) else {
            debug!("Section {} not found", self.layout.tag.tag);
            return SectorReadings::default();
        };

        let mut data_start = tag_idx + 1;
        let columns: Vec<Option<usize>> = if self.layout.has_header() {
            let header = rows.get(tag_idx + 1).map(Vec::as_slice).unwrap_or(&[]);
            data_start += 1;
            self.layout
                .selectors
                .iter()
                .map(|sel| resolve_column(*sel, header))
                .collect()
        } else {
            self.layout
                .selectors
                .iter()
                .map(|sel| match sel {
                    ColumnSelector::Fixed(idx) => Some(*idx),
                    ColumnSelector::HeaderSuffix(_) => None,
                })
                .collect()
        };

        for (sel, col) in self.layout.selectors.iter().zip(&columns) {
            if col.is_none() {
                warn!(
                    "Section {}: no column for {:?}; its values stay missing",
                    self.layout.tag.tag, sel
                );
            }
        }

        let mut readings = SectorReadings {
            found: true,
            values: BTreeMap::new(),
        };

        for row in rows.iter().skip(data_start) {
            if is_blank(row) {
                match self.layout.blank_rows {
                    BlankRowPolicy::Terminate => break,
                    BlankRowPolicy::Skip => continue,
                }
            }
            if is_section_boundary(row) {
                break;
            }
            let label = first_cell(row);
            if self.layout.skip_labels.contains(&label) {
                continue;
            }
            let Some(sector) = Sector::from_label(label) else {
                continue;
            };
            // a bare label carries no reading and must not erase one
            if !columns.iter().flatten().any(|&c| c < row.len()) {
                continue;
            }
            let slots = columns
                .iter()
                .map(|col| col.and_then(|c| row.get(c)).and_then(|cell| parse_number(cell)))
                .collect();
            readings.values.insert(sector, slots);
        }

        debug!(
            "Section {}: {} sector row(s)",
            self.layout.tag.tag,
            readings.values.len()
        );
        readings
    }
}

fn resolve_column(selector: ColumnSelector, header: &[String]) -> Option<usize> {
    match selector {
        ColumnSelector::Fixed(idx) => Some(idx),
        ColumnSelector::HeaderSuffix(marker) => header
            .iter()
            .position(|cell| cell.trim().ends_with(marker)),
    }
}
