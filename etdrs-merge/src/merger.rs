//! Cross-Table Merger
//!
//! Combines a priority ("new") table with a base ("old") table. Column order
//! is the priority table's columns followed by the base table's unseen ones.
//! Cell precedence for subjects present in both tables:
//!
//! | priority | base   | result   |
//! |----------|--------|----------|
//! | number   | number | priority |
//! | number   | other  | priority |
//! | other    | number | base     |
//! | other    | other  | missing  |
//!
//! "Other" is missing or non-numeric text. Output rows are sorted by id.

use etdrs_common::table::SubjectRecord;
use etdrs_common::{AggregateTable, Cell, SubjectId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Counters reported after a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Subjects only in the priority table
    pub priority_only: usize,
    /// Subjects only in the base table
    pub base_only: usize,
    /// Subjects in both tables
    pub shared: usize,
    /// Cells where both tables held different numbers
    pub conflicts: usize,
    /// Cells where the base table filled a gap
    pub filled_from_base: usize,
}

/// Merged table plus counters
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: AggregateTable,
    pub stats: MergeStats,
}

/// Resolve one cell of a shared subject
pub fn resolve_cell(priority: &Cell, base: &Cell) -> Cell {
    match (priority.as_number(), base.as_number()) {
        (Some(_), _) => priority.clone(),
        (None, Some(_)) => base.clone(),
        (None, None) => Cell::Missing,
    }
}

/// Merge `priority` over `base` into a new table
pub fn merge_tables(priority: &AggregateTable, base: &AggregateTable) -> MergeOutcome {
    let columns = priority.columns().union(base.columns());
    let mut table = AggregateTable::new(priority.id_column(), columns.clone());
    let mut stats = MergeStats::default();

    let ids: BTreeSet<&SubjectId> = priority.ids().chain(base.ids()).collect();
    for id in ids {
        let record = match (priority.get(id), base.get(id)) {
            (Some(p), Some(b)) => {
                stats.shared += 1;
                let mut merged = SubjectRecord::new();
                for column in columns.iter() {
                    let (pc, bc) = (p.get(column), b.get(column));
                    match (pc.as_number(), bc.as_number()) {
                        (Some(x), Some(y)) if x != y => {
                            stats.conflicts += 1;
                            debug!("{} {}: priority {} over base {}", id, column, x, y);
                        }
                        (None, Some(_)) => stats.filled_from_base += 1,
                        _ => {}
                    }
                    let cell = resolve_cell(pc, bc);
                    if !cell.is_missing() {
                        merged.set(column, cell);
                    }
                }
                merged
            }
            (Some(p), None) => {
                stats.priority_only += 1;
                p.clone()
            }
            (None, Some(b)) => {
                stats.base_only += 1;
                b.clone()
            }
            (None, None) => continue,
        };
        table.insert(id.clone(), record);
    }

    info!(
        "Merged {} subject(s): {} shared, {} priority-only, {} base-only, {} numeric conflict(s)",
        table.len(),
        stats.shared,
        stats.priority_only,
        stats.base_only,
        stats.conflicts
    );
    MergeOutcome { table, stats }
}
