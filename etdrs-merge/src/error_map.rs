//! Error maps
//!
//! Noise annotations carry short digit codes per coarse quadrant (`1`, `29`,
//! ...), each digit naming a defect type. An error map expands them onto the
//! nine fine sectors per eye as `1`/blank flags, keeping only the defect
//! types of interest. Proportions then summarise how many subjects lost some
//! or all of their sectors.

use etdrs_common::table::SubjectRecord;
use etdrs_common::{AggregateTable, Cell, ColumnSet, ColumnStyle, Quadrant, Sector, Side, SubjectId};
use serde::Serialize;
use tracing::{info, warn};

/// Value written to a flagged fine cell
pub const FLAG: &str = "1";

/// Defect digits that count as an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitSet(Vec<char>);

impl DigitSet {
    /// Every ASCII digit in `text` (`"29"` → {2, 9}); `None` when there is none
    pub fn parse(text: &str) -> Option<Self> {
        let mut digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
        digits.sort_unstable();
        digits.dedup();
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    /// Does the code contain any digit of the set?
    pub fn matches(&self, code: &str) -> bool {
        let code = code.trim();
        !code.is_empty() && code.chars().any(|c| self.0.contains(&c))
    }
}

/// Coarse code for `side`/`quadrant`, whichever separator style the table uses
fn coarse_code(record: &SubjectRecord, side: Side, quadrant: Quadrant) -> &str {
    ColumnStyle::ALL
        .iter()
        .map(|style| record.get(&style.quadrant_column(side, quadrant)))
        .find(|cell| !cell.is_missing())
        .map(Cell::text)
        .unwrap_or("")
}

/// Fold a repeated noise row into the earlier one by joining the codes, so
/// every defect digit of every row is seen
pub fn combine_codes(id: &SubjectId, existing: &mut SubjectRecord, incoming: SubjectRecord) {
    warn!("Noise table repeats {}: codes from every row apply", id);
    for (column, cell) in incoming.iter() {
        let joined = format!("{}{}", existing.get(column).text(), cell.text());
        existing.set(column, Cell::parse(&joined));
    }
}

/// Expand a coarse noise table into a fine 18-column flag table
pub fn expand_error_map(noise: &AggregateTable, digits: &DigitSet, style: ColumnStyle) -> AggregateTable {
    let columns: ColumnSet = style.sector_columns().into_iter().collect();
    let mut table = AggregateTable::new(noise.id_column(), columns);
    let mut flagged_cells = 0;

    for (id, record) in noise.iter() {
        let mut fine = SubjectRecord::new();
        for side in Side::ALL {
            for quadrant in Quadrant::ALL {
                if !digits.matches(coarse_code(record, side, quadrant)) {
                    continue;
                }
                for sector in quadrant.fine_sectors() {
                    fine.set(style.sector_column(side, *sector), Cell::parse(FLAG));
                    flagged_cells += 1;
                }
            }
        }
        table.insert(id.clone(), fine);
    }

    info!(
        "Error map: {} subject(s), {} flagged fine cell(s)",
        table.len(),
        flagged_cells
    );
    table
}

/// Subject counts over a fine flag table
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorProportions {
    pub total: usize,
    /// At least one flagged sector
    pub any_error: Vec<SubjectId>,
    /// All 18 sectors flagged
    pub complete: Vec<SubjectId>,
    /// Right eye fully flagged, left eye not
    pub right_only: Vec<SubjectId>,
    /// Left eye fully flagged, right eye not
    pub left_only: Vec<SubjectId>,
}

impl ErrorProportions {
    /// Share of all subjects, in percent; 0 for an empty table
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }

    /// Emit the summary through tracing
    pub fn log(&self) {
        info!("Subjects: {}", self.total);
        for (label, ids) in [
            ("At least one flagged sector", &self.any_error),
            ("Both eyes fully flagged", &self.complete),
            ("Right eye only fully flagged", &self.right_only),
            ("Left eye only fully flagged", &self.left_only),
        ] {
            info!(
                "{}: {} / {} ({:.1}%)",
                label,
                ids.len(),
                self.total,
                self.percent(ids.len())
            );
            if !ids.is_empty() {
                let list: Vec<&str> = ids.iter().map(SubjectId::as_str).collect();
                info!("  IDs: {}", list.join(", "));
            }
        }
    }
}

fn is_flagged(record: &SubjectRecord, side: Side, sector: Sector) -> bool {
    ColumnStyle::ALL
        .iter()
        .any(|style| record.get(&style.sector_column(side, sector)).text() == FLAG)
}

/// Count subjects by how much of each eye is flagged
pub fn error_proportions(flags: &AggregateTable) -> ErrorProportions {
    let mut result = ErrorProportions {
        total: flags.len(),
        ..ErrorProportions::default()
    };

    for (id, record) in flags.iter() {
        let side_flags = |side: Side| Sector::ALL.map(|sector| is_flagged(record, side, sector));
        let right = side_flags(Side::Right);
        let left = side_flags(Side::Left);

        let right_all = right.iter().all(|f| *f);
        let left_all = left.iter().all(|f| *f);

        if right.iter().chain(left.iter()).any(|f| *f) {
            result.any_error.push(id.clone());
        }
        match (right_all, left_all) {
            (true, true) => result.complete.push(id.clone()),
            (true, false) => result.right_only.push(id.clone()),
            (false, true) => result.left_only.push(id.clone()),
            (false, false) => {}
        }
    }
    result
}
