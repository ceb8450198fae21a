//! Noise Mask Applier
//!
//! A noise annotation table flags coarse quadrants per eye. Every flagged
//! quadrant clears its fine sectors in the target table: `Center` clears the
//! center cell, the ring quadrants clear their inner and outer pair.
//!
//! Column names are matched in either separator style (`L-Superior`,
//! `L_Superior`), so thickness-era and density-era tables mix freely.

use etdrs_common::table::SubjectRecord;
use etdrs_common::{AggregateTable, Cell, ColumnStyle, Quadrant, Side, SubjectId};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Masked table plus audit counters
#[derive(Debug, Clone)]
pub struct MaskOutcome {
    pub table: AggregateTable,
    pub report: MaskReport,
}

/// What the mask did
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaskReport {
    /// Cells that held a value and were cleared
    pub masked_cells: usize,
    /// Noise subjects with at least one flag
    pub flagged_subjects: usize,
    /// Noise subjects absent from the target, skipped
    pub unknown_subjects: Vec<SubjectId>,
}

/// Flag-driven masking rule
#[derive(Debug, Clone)]
pub struct NoiseMask {
    flags: Vec<String>,
}

impl NoiseMask {
    /// `flags` are the trimmed cell values that mark a quadrant as noisy
    pub fn new(flags: Vec<String>) -> Self {
        Self { flags }
    }

    pub fn is_flag(&self, cell: &Cell) -> bool {
        let text = cell.text().trim();
        self.flags.iter().any(|f| f == text)
    }

    /// Fold a repeated noise row into the earlier one. A quadrant flagged in
    /// either row stays flagged.
    pub fn combine_rows(&self, id: &SubjectId, existing: &mut SubjectRecord, incoming: SubjectRecord) {
        warn!("Noise table repeats {}: flags from every row apply", id);
        for (column, cell) in incoming.iter() {
            if self.is_flag(cell) || existing.get(column).is_missing() {
                existing.set(column, cell.clone());
            }
        }
    }

    /// Apply `noise` to a copy of `target`
    pub fn apply(&self, target: &AggregateTable, noise: &AggregateTable) -> MaskOutcome {
        let mut table = target.clone();
        let mut report = MaskReport::default();

        for (id, flags) in noise.iter() {
            if !table.contains(id) {
                debug!("Noise row {} has no target row, skipped", id);
                report.unknown_subjects.push(id.clone());
                continue;
            }

            let mut flagged = false;
            for side in Side::ALL {
                for quadrant in Quadrant::ALL {
                    let noisy = ColumnStyle::ALL
                        .iter()
                        .map(|style| flags.get(&style.quadrant_column(side, quadrant)))
                        .any(|cell| self.is_flag(cell));
                    if !noisy {
                        continue;
                    }
                    flagged = true;
                    report.masked_cells += clear_quadrant(&mut table, id, side, quadrant);
                }
            }
            if flagged {
                report.flagged_subjects += 1;
            }
        }

        info!(
            "Masked {} cell(s) across {} flagged subject(s); {} noise subject(s) not in target",
            report.masked_cells,
            report.flagged_subjects,
            report.unknown_subjects.len()
        );
        MaskOutcome { table, report }
    }
}

/// Clear the fine sectors of one quadrant; returns cells that held a value
fn clear_quadrant(table: &mut AggregateTable, id: &SubjectId, side: Side, quadrant: Quadrant) -> usize {
    let columns: Vec<String> = quadrant
        .fine_sectors()
        .iter()
        .flat_map(|sector| ColumnStyle::ALL.map(|style| style.sector_column(side, *sector)))
        .filter(|column| table.columns().contains(column))
        .collect();

    let Some(record) = table.get_mut(id) else {
        return 0;
    };
    let mut cleared = 0;
    for column in &columns {
        if !record.clear(column).is_missing() {
            debug!("{} {}: cleared", id, column);
            cleared += 1;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use etdrs_common::ColumnSet;

    fn id(raw: &str) -> SubjectId {
        SubjectId::from_key(raw)
    }

    fn full_target(style: ColumnStyle) -> AggregateTable {
        let columns: ColumnSet = style.sector_columns().into_iter().collect();
        let mut table = AggregateTable::new("ID", columns.clone());
        let mut record = SubjectRecord::new();
        for (i, column) in columns.iter().enumerate() {
            record.set(column, Cell::number(i as f64 + 1.0));
        }
        table.insert(id("EG0001"), record);
        table
    }

    fn noise(cells: &[(&str, &str)]) -> AggregateTable {
        let columns: ColumnSet = cells.iter().map(|(c, _)| *c).collect();
        let mut table = AggregateTable::new("ID", columns);
        let mut record = SubjectRecord::new();
        for (column, value) in cells {
            record.set(*column, Cell::parse(value));
        }
        table.insert(id("EG0001"), record);
        table
    }

    fn mask() -> NoiseMask {
        NoiseMask::new(vec!["1".to_string(), "１".to_string()])
    }

    fn missing_columns(table: &AggregateTable) -> Vec<String> {
        table
            .columns()
            .iter()
            .filter(|c| table.cell(&id("EG0001"), c).is_missing())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_superior_clears_inner_and_outer_pair_only() {
        let target = full_target(ColumnStyle::Underscore);
        let outcome = mask().apply(&target, &noise(&[("L-Superior", "1")]));

        assert_eq!(
            missing_columns(&outcome.table),
            vec!["L_Inner_Superior", "L_Outer_Superior"]
        );
        assert_eq!(outcome.report.masked_cells, 2);
        assert!(missing_columns(&target).is_empty());
    }

    #[test]
    fn test_center_clears_only_center() {
        let target = full_target(ColumnStyle::Hyphen);
        let outcome = mask().apply(&target, &noise(&[("L_Center", " １ ")]));
        assert_eq!(missing_columns(&outcome.table), vec!["L-Center"]);
        assert_eq!(outcome.report.masked_cells, 1);
    }

    #[test]
    fn test_zero_and_other_codes_are_not_flags() {
        let target = full_target(ColumnStyle::Underscore);
        let outcome = mask().apply(
            &target,
            &noise(&[("R-Temporal", "0"), ("R-Nasal", "12"), ("R-Center", "")]),
        );
        assert!(missing_columns(&outcome.table).is_empty());
        assert_eq!(outcome.report.masked_cells, 0);
        assert_eq!(outcome.report.flagged_subjects, 0);
    }

    #[test]
    fn test_already_missing_cells_not_counted() {
        let mut target = full_target(ColumnStyle::Underscore);
        target.get_mut(&id("EG0001")).unwrap().clear("R_Inner_Nasal");
        let outcome = mask().apply(&target, &noise(&[("R-Nasal", "1")]));
        assert_eq!(outcome.report.masked_cells, 1);
        assert!(outcome.table.cell(&id("EG0001"), "R_Outer_Nasal").is_missing());
    }

    #[test]
    fn test_repeated_noise_rows_apply_every_flag() {
        let header: Vec<String> = ["ID", "L-Superior", "R-Center"].map(String::from).to_vec();
        let data: Vec<Vec<String>> = vec![
            ["EG0001", "1", ""].map(String::from).to_vec(),
            ["EG0001", "0", "1"].map(String::from).to_vec(),
        ];
        let rule = mask();
        let noise_table = AggregateTable::from_rows_with(&header, &data, "ID", |id, existing, incoming| {
            rule.combine_rows(id, existing, incoming)
        })
        .unwrap();

        let outcome = rule.apply(&full_target(ColumnStyle::Underscore), &noise_table);
        assert_eq!(
            missing_columns(&outcome.table),
            vec!["R_Center", "L_Inner_Superior", "L_Outer_Superior"]
        );
        assert_eq!(outcome.report.masked_cells, 3);
        assert_eq!(outcome.report.flagged_subjects, 1);
    }

    #[test]
    fn test_unknown_noise_subject_skipped() {
        let target = full_target(ColumnStyle::Underscore);
        let mut noise_table = noise(&[("R-Center", "1")]);
        noise_table.insert(id("EG0099"), {
            let mut r = SubjectRecord::new();
            r.set("R-Center", Cell::parse("1"));
            r
        });

        let outcome = mask().apply(&target, &noise_table);
        assert_eq!(outcome.table.len(), 1);
        assert!(!outcome.table.contains(&id("EG0099")));
        assert_eq!(outcome.report.unknown_subjects, vec![id("EG0099")]);
        assert_eq!(outcome.report.masked_cells, 1);
    }
}
